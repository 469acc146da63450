//! Set command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// Replace a node's data.
#[derive(Args, Debug)]
pub struct SetCmd {
    /// Node path, relative to the chroot.
    pub path: String,

    /// New data.
    pub data: String,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl SetCmd {
    /// Execute the set command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;
        client.set(&self.path, self.data.as_bytes())?;
        println!("Updated {}", self.path);
        client.close()
    }
}
