//! Create command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// Create a node.
#[derive(Args, Debug)]
pub struct CreateCmd {
    /// Node path, relative to the chroot.
    pub path: String,

    /// Initial data.
    #[arg(default_value = "")]
    pub data: String,

    /// Create missing parents too (data goes on the last node only).
    #[arg(short, long)]
    pub parents: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl CreateCmd {
    /// Execute the create command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        if self.parents {
            client.mkdir_p(&self.path)?;
            if !self.data.is_empty() {
                client.set(&self.path, self.data.as_bytes())?;
            }
            println!("Ensured {}", self.path);
        } else {
            let created = client.create(&self.path, self.data.as_bytes())?;
            println!("Created {}", created);
        }

        client.close()
    }
}
