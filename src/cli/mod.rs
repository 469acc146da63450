//! CLI command implementations.

pub mod check;
pub mod config;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod mkdir;
pub mod serve;
pub mod set;

use clap::Args;
use std::time::Duration;
use zkchroot::client::{Client, TcpTransport};
use zkchroot::config::ClientConfig;
use zkchroot::ChrootOption;

/// Connection flags shared by every client command.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Connection string (host:port[,host:port...][/chroot]).
    #[arg(short, long)]
    pub server: Option<String>,

    /// Chroot option: create, check, ignore or an absolute path.
    #[arg(long)]
    pub chroot: Option<ChrootOption>,

    /// Overall connect timeout (e.g. 5s, 1m).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl ConnectArgs {
    /// Bootstrap a client, with flags taking precedence over `config`.
    pub fn connect(&self, config: &ClientConfig) -> zkchroot::Result<Client<TcpTransport>> {
        let server = self.server.as_deref().unwrap_or(&config.connect_string);

        let mut options = config.connect_options();
        if let Some(chroot) = &self.chroot {
            options.chroot = Some(chroot.clone());
        }
        if let Some(timeout) = self.timeout {
            options.timeout = Some(timeout);
        }

        zkchroot::connect(server, &options)
    }
}
