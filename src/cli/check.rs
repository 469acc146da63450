//! Check command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// Bootstrap a connection and report where it landed.
#[derive(Args, Debug)]
pub struct CheckCmd {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl CheckCmd {
    /// Execute the check command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        println!("Connected to {}", client.transport().peer());
        match client.chroot() {
            Some(chroot) => println!("  Chroot: {}", chroot),
            None => println!("  Chroot: none"),
        }

        client.close()
    }
}
