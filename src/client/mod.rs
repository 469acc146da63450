//! Client handle and the transport seam it drives.
//!
//! A [`Transport`] speaks absolute node paths to some coordination server.
//! A [`Client`] wraps a transport together with the chroot fixed at
//! bootstrap, translating every caller path into the chroot.

pub mod tcp;

use crate::bootstrap::Deadline;
use crate::chroot::path;
use crate::chroot::resolver::ensure_path;
use crate::error::{Error, Result};

pub use tcp::TcpTransport;

/// Unscoped connection to a coordination server.
///
/// All paths are absolute and already validated. Implementations report
/// missing nodes as [`Error::NoNode`], duplicates as [`Error::NodeExists`]
/// and deletes of nodes with children as [`Error::NotEmpty`]. `create`
/// fails with `NoNode` when the parent is missing.
pub trait Transport {
    /// Check whether a node exists.
    fn exists(&mut self, path: &str) -> Result<bool>;

    /// Create a node and return the path the server created.
    fn create(&mut self, path: &str, data: &[u8]) -> Result<String>;

    /// Read a node's data.
    fn get_data(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Replace a node's data.
    fn set_data(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Delete a childless node.
    fn delete(&mut self, path: &str) -> Result<()>;

    /// Names of a node's children.
    fn get_children(&mut self, path: &str) -> Result<Vec<String>>;

    /// End the session.
    fn close(&mut self) -> Result<()>;

    /// Whether [`Transport::close`] has been called.
    fn is_closed(&self) -> bool;

    /// Bound blocking I/O by `deadline`, or lift the bound with `None`.
    fn set_deadline(&mut self, _deadline: Option<Deadline>) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exists(&mut self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }

    fn create(&mut self, path: &str, data: &[u8]) -> Result<String> {
        (**self).create(path, data)
    }

    fn get_data(&mut self, path: &str) -> Result<Vec<u8>> {
        (**self).get_data(path)
    }

    fn set_data(&mut self, path: &str, data: &[u8]) -> Result<()> {
        (**self).set_data(path, data)
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        (**self).delete(path)
    }

    fn get_children(&mut self, path: &str) -> Result<Vec<String>> {
        (**self).get_children(path)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn set_deadline(&mut self, deadline: Option<Deadline>) {
        (**self).set_deadline(deadline)
    }
}

/// Client handle scoped to a chroot.
///
/// Every path argument is absolute from the caller's point of view and is
/// prefixed with the chroot before reaching the transport. The chroot is
/// fixed for the lifetime of the handle. Dropping an open client closes it.
pub struct Client<T: Transport> {
    transport: T,
    /// Empty when unscoped.
    chroot: String,
}

impl<T: Transport> Client<T> {
    /// Wrap a transport without any chroot.
    pub fn new(transport: T) -> Self {
        Self::scoped(transport, String::new())
    }

    /// Wrap a transport under `chroot` (empty for none).
    pub(crate) fn scoped(transport: T, chroot: String) -> Self {
        Self { transport, chroot }
    }

    /// The chroot this client operates under, if any.
    pub fn chroot(&self) -> Option<&str> {
        if self.chroot.is_empty() {
            None
        } else {
            Some(&self.chroot)
        }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the client has been closed.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Check whether a node exists.
    pub fn exists(&mut self, path: &str) -> Result<bool> {
        let full = self.full_path(path)?;
        self.transport.exists(&full).map_err(|e| self.relative(e))
    }

    /// Read a node's data.
    pub fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path)?;
        self.transport.get_data(&full).map_err(|e| self.relative(e))
    }

    /// Replace a node's data.
    pub fn set(&mut self, path: &str, data: impl AsRef<[u8]>) -> Result<()> {
        let full = self.full_path(path)?;
        self.transport
            .set_data(&full, data.as_ref())
            .map_err(|e| self.relative(e))
    }

    /// Create a node. Returns the created path relative to the chroot.
    pub fn create(&mut self, path: &str, data: impl AsRef<[u8]>) -> Result<String> {
        let full = self.full_path(path)?;
        let created = self
            .transport
            .create(&full, data.as_ref())
            .map_err(|e| self.relative(e))?;
        Ok(path::strip(&self.chroot, &created))
    }

    /// Delete a childless node.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let full = self.full_path(path)?;
        self.transport.delete(&full).map_err(|e| self.relative(e))
    }

    /// Names of a node's children, sorted.
    pub fn children(&mut self, path: &str) -> Result<Vec<String>> {
        let full = self.full_path(path)?;
        let mut children = self
            .transport
            .get_children(&full)
            .map_err(|e| self.relative(e))?;
        children.sort();
        Ok(children)
    }

    /// Create `path` and any missing ancestors. Existing nodes are left alone.
    pub fn mkdir_p(&mut self, path: &str) -> Result<()> {
        let full = self.full_path(path)?;
        ensure_path(&mut self.transport, &full)
            .map(|_| ())
            .map_err(|e| self.relative(e))
    }

    /// Delete `path` and everything below it. A missing path is not an error.
    ///
    /// `rm_rf("/")` clears the client's root but keeps the root node itself,
    /// so a scoped client stays bound to an existing chroot.
    pub fn rm_rf(&mut self, path: &str) -> Result<()> {
        let full = self.full_path(path)?;
        let keep = path == "/";
        remove_recursive(&mut self.transport, &full, keep).map_err(|e| self.relative(e))
    }

    /// Close the session. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.transport.is_closed() {
            return Ok(());
        }
        tracing::debug!(chroot = %self.chroot, "closing client");
        self.transport.close()
    }

    fn full_path(&self, user_path: &str) -> Result<String> {
        if self.transport.is_closed() {
            return Err(Error::Closed);
        }
        path::validate(user_path)?;
        Ok(path::join(&self.chroot, user_path))
    }

    /// Report node errors with chroot-relative paths.
    fn relative(&self, err: Error) -> Error {
        match err {
            Error::NoNode { path: p } => Error::NoNode {
                path: path::strip(&self.chroot, &p),
            },
            Error::NodeExists { path: p } => Error::NodeExists {
                path: path::strip(&self.chroot, &p),
            },
            Error::NotEmpty { path: p } => Error::NotEmpty {
                path: path::strip(&self.chroot, &p),
            },
            other => other,
        }
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::debug!(error = %e, "error closing client on drop");
        }
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("chroot", &self.chroot)
            .field("closed", &self.transport.is_closed())
            .finish()
    }
}

/// Depth-first delete that tolerates nodes vanishing underneath it. With
/// `keep` set only the descendants of `full` are removed.
fn remove_recursive<T: Transport + ?Sized>(transport: &mut T, full: &str, keep: bool) -> Result<()> {
    let children = match transport.get_children(full) {
        Ok(children) => children,
        Err(e) if e.is_no_node() => return Ok(()),
        Err(e) => return Err(e),
    };

    for name in children {
        remove_recursive(transport, &path::child(full, &name), false)?;
    }

    if keep {
        return Ok(());
    }

    match transport.delete(full) {
        Ok(()) => Ok(()),
        Err(e) if e.is_no_node() => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;

    #[test]
    fn test_scoped_paths_are_prefixed() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/app/prod").unwrap();

        let mut client = Client::scoped(tree.session(), "/app/prod".to_string());
        assert_eq!(client.chroot(), Some("/app/prod"));
        assert!(client.exists("/").unwrap());
        assert_eq!(client.create("/blah", b"data").unwrap(), "/blah");

        assert_eq!(tree.get("/app/prod/blah").unwrap(), b"data");
        assert_eq!(client.children("/").unwrap(), vec!["blah"]);
    }

    #[test]
    fn test_unscoped_client_is_identity() {
        let tree = MemoryTree::new();
        let mut client = Client::new(tree.session());
        assert_eq!(client.chroot(), None);
        client.create("/x", b"1").unwrap();
        assert!(tree.exists("/x").unwrap());
    }

    #[test]
    fn test_errors_report_relative_paths() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/app").unwrap();
        let mut client = Client::scoped(tree.session(), "/app".to_string());

        match client.get("/missing") {
            Err(Error::NoNode { path }) => assert_eq!(path, "/missing"),
            other => panic!("expected NoNode, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_user_path_is_rejected() {
        let tree = MemoryTree::new();
        let mut client = Client::new(tree.session());
        assert!(matches!(client.exists("relative"), Err(Error::InvalidPath { .. })));
        assert!(matches!(client.create("/a/", b""), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_mkdir_p_and_rm_rf() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/app").unwrap();
        let mut client = Client::scoped(tree.session(), "/app".to_string());

        client.mkdir_p("/a/b/c").unwrap();
        client.mkdir_p("/a/b/c").unwrap();
        client.set("/a/b", b"keep").unwrap();
        assert!(tree.exists("/app/a/b/c").unwrap());

        client.rm_rf("/a").unwrap();
        assert!(!tree.exists("/app/a").unwrap());
        assert!(tree.exists("/app").unwrap());

        // Already gone
        client.rm_rf("/a").unwrap();
    }

    #[test]
    fn test_rm_rf_root_clears_children_only() {
        let tree = MemoryTree::new();
        let mut client = Client::new(tree.session());
        client.mkdir_p("/x/y").unwrap();
        client.create("/z", b"").unwrap();

        client.rm_rf("/").unwrap();
        assert!(client.children("/").unwrap().is_empty());
        assert!(client.exists("/").unwrap());
    }

    #[test]
    fn test_scoped_rm_rf_root_keeps_chroot() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/app").unwrap();
        tree.create("/other", b"").unwrap();
        let mut client = Client::scoped(tree.session(), "/app".to_string());
        client.mkdir_p("/x/y").unwrap();
        client.create("/z", b"").unwrap();

        client.rm_rf("/").unwrap();
        assert!(tree.exists("/app").unwrap());
        assert!(tree.exists("/other").unwrap());
        assert!(tree.children("/app").unwrap().is_empty());

        assert!(client.exists("/").unwrap());
        assert_eq!(client.create("/y", b"").unwrap(), "/y");
        assert!(tree.exists("/app/y").unwrap());
    }

    #[test]
    fn test_closed_client_rejects_operations() {
        let tree = MemoryTree::new();
        let mut client = Client::new(tree.session());
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert!(matches!(client.exists("/"), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_closes_session() {
        let tree = MemoryTree::new();
        {
            let _client = Client::new(tree.session());
            assert_eq!(tree.open_sessions(), 1);
        }
        assert_eq!(tree.open_sessions(), 0);
    }
}
