//! Delete command implementation.

use super::ConnectArgs;
use clap::Args;
use zkchroot::config::ClientConfig;

/// Delete a node.
#[derive(Args, Debug)]
pub struct DeleteCmd {
    /// Node path, relative to the chroot.
    pub path: String,

    /// Delete the node and everything below it.
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip the confirmation for recursive deletes.
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl DeleteCmd {
    /// Execute the delete command.
    pub fn run(&self, config: &ClientConfig) -> zkchroot::Result<()> {
        let mut client = self.connect.connect(config)?;

        if !self.recursive {
            client.delete(&self.path)?;
            println!("Deleted {}", self.path);
            return client.close();
        }

        // Confirm recursive deletion unless --force
        if !self.force {
            eprint!("Delete '{}' and everything below it? [y/N] ", self.path);
            let mut input = String::new();
            if std::io::stdin().read_line(&mut input).is_ok() {
                let input = input.trim().to_lowercase();
                if input != "y" && input != "yes" {
                    println!("Cancelled");
                    return client.close();
                }
            } else {
                println!("Cancelled");
                return client.close();
            }
        }

        client.rm_rf(&self.path)?;
        println!("Deleted {} recursively", self.path);
        client.close()
    }
}
