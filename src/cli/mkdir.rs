//! Mkdir command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// Create a node and any missing parents.
#[derive(Args, Debug)]
pub struct MkdirCmd {
    /// Node paths, relative to the chroot.
    #[arg(required = true)]
    pub paths: Vec<String>,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl MkdirCmd {
    /// Execute the mkdir command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        for path in &self.paths {
            client.mkdir_p(path)?;
            println!("Ensured {}", path);
        }

        client.close()
    }
}
