//! Development server command.

use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use zkchroot::tree::MemoryTree;
use zkchroot::Result;
use zkchroot_protocol::ports;

/// Run a development server backed by an in-memory tree.
#[derive(Parser, Debug)]
pub struct ServeCmd {
    /// Listen address.
    #[arg(short, long, default_value_t = default_listen())]
    listen: SocketAddr,

    /// Node paths to create at startup (repeatable).
    #[arg(long = "mkdir")]
    mkdir: Vec<String>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, ports::CLIENT))
}

impl ServeCmd {
    /// Address the server will bind.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen
    }

    /// Run the serve command.
    pub fn run(self) -> Result<()> {
        let addr = self.listen_addr();

        let tree = MemoryTree::new();
        for path in &self.mkdir {
            tree.mkdir_p(path)?;
            tracing::info!(path = %path, "seeded node");
        }

        let listener = TcpListener::bind(addr)?;

        tracing::info!(address = %addr, "starting development server");
        println!("zkchroot development server listening on {}", listener.local_addr()?);

        zkchroot::server::serve(listener, tree)
    }
}
