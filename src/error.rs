//! Error types for zkchroot.

use std::time::Duration;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bootstrapping or using a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// The chroot option and connection string don't describe a usable chroot.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Check mode found the chroot path absent.
    #[error("chroot path does not exist: {path}")]
    ChrootPathDoesNotExist { path: String },

    /// The bootstrap deadline passed before the client was ready.
    #[error("timed out connecting after {timeout:?}")]
    ConnectionTimeout { timeout: Duration },

    /// A node path was malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The node (or its parent) does not exist.
    #[error("no such node: {path}")]
    NoNode { path: String },

    /// The node already exists.
    #[error("node already exists: {path}")]
    NodeExists { path: String },

    /// The node still has children.
    #[error("node not empty: {path}")]
    NotEmpty { path: String },

    /// The server rejected the request or replied unexpectedly.
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation attempted on a closed client.
    #[error("client is closed")]
    Closed,

    /// Failed to load configuration.
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Failed to save configuration.
    #[error("failed to save config: {0}")]
    ConfigSave(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the "already exists" condition tolerated by mkdir -p.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, Error::NodeExists { .. })
    }

    /// Returns true if the node was missing.
    pub fn is_no_node(&self) -> bool {
        matches!(self, Error::NoNode { .. })
    }
}

impl From<zkchroot_protocol::DecodeError> for Error {
    fn from(e: zkchroot_protocol::DecodeError) -> Self {
        match e {
            zkchroot_protocol::DecodeError::Io(io) => Error::Io(io),
            other => Error::Transport(other.to_string()),
        }
    }
}
