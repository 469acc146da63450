//! Get command implementation.

use super::ConnectArgs;
use clap::Args;
use std::io::Write;
use zkchroot::config::ClientConfig;

/// Print a node's data.
#[derive(Args, Debug)]
pub struct GetCmd {
    /// Node path, relative to the chroot.
    pub path: String,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl GetCmd {
    /// Execute the get command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        let data = client.get(&self.path)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&data)?;
        if !data.ends_with(b"\n") {
            stdout.write_all(b"\n")?;
        }

        client.close()
    }
}
