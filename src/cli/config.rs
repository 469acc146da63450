//! Config command implementation.

use clap::Args;
use std::time::Duration;
use zkchroot::config::ClientConfig;
use zkchroot::{ChrootOption, ConnectString};

/// Show or update default connection settings.
#[derive(Args, Debug)]
pub struct ConfigCmd {
    /// Default connection string.
    #[arg(short, long)]
    pub server: Option<String>,

    /// Default chroot option: create, check, ignore or an absolute path.
    #[arg(long, conflicts_with = "clear_chroot")]
    pub chroot: Option<ChrootOption>,

    /// Remove the default chroot option.
    #[arg(long)]
    pub clear_chroot: bool,

    /// Default connect timeout (e.g. 5s, 1m).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl ConfigCmd {
    /// Execute the config command.
    pub fn run(&self, config: &mut ClientConfig) -> zkchroot::Result<()> {
        let mut changed = false;

        if let Some(server) = &self.server {
            // Reject bad strings now rather than at the next connect
            ConnectString::parse(server)?;
            config.connect_string = server.clone();
            changed = true;
        }
        if let Some(chroot) = &self.chroot {
            config.chroot = Some(chroot.clone());
            changed = true;
        }
        if self.clear_chroot {
            config.chroot = None;
            changed = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
            changed = true;
        }

        if changed {
            config.save()?;
            tracing::info!("saved configuration");
        }

        println!("Server:  {}", config.connect_string);
        match &config.chroot {
            Some(chroot) => println!("Chroot:  {}", chroot),
            None => println!("Chroot:  (from connection string)"),
        }
        println!("Timeout: {}", humantime::format_duration(config.timeout));

        Ok(())
    }
}
