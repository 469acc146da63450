//! zkchroot - chroot-aware connection bootstrap for coordination-service clients.
//!
//! Given a connection string such as `"zk1:2181,zk2:2181/app/prod"` and an
//! optional [`ChrootOption`], [`connect`] parses the server list, decides which
//! chroot path applies and how to reconcile its existence, and hands back a
//! [`Client`] whose paths are all interpreted relative to that chroot.
//!
//! ```no_run
//! use zkchroot::{ChrootOption, ConnectOptions};
//!
//! let options = ConnectOptions::default().with_chroot(ChrootOption::Check);
//! let mut client = zkchroot::connect("localhost:2181/app", &options)?;
//! client.create("/lock", b"")?;
//! # Ok::<(), zkchroot::Error>(())
//! ```

pub mod address;
pub mod bootstrap;
pub mod chroot;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod tree;

pub use address::{Address, ConnectString};
pub use bootstrap::{bootstrap_with, connect, ConnectOptions};
pub use chroot::{ChrootMode, ChrootOption, ResolvedTarget};
pub use client::{Client, Transport};
pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
