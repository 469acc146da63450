//! List command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// List the children of a node.
#[derive(Args, Debug)]
pub struct ListCmd {
    /// Node path, relative to the chroot.
    #[arg(default_value = "/")]
    pub path: String,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl ListCmd {
    /// Execute the list command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        let children = client.children(&self.path)?;
        if children.is_empty() {
            println!("No children under {}", self.path);
        } else {
            for name in children {
                println!("{}", name);
            }
        }

        client.close()
    }
}
