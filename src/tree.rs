//! In-process znode tree.
//!
//! [`MemoryTree`] is a shared hierarchical store with coordination-service
//! semantics (create needs an existing parent, delete needs no children).
//! Clones share the same tree. [`MemorySession`] is one connection to it and
//! implements [`Transport`]; the development server hands one session to
//! each TCP connection. Only trees built with [`MemoryTree::recording`]
//! keep a log of the requests their sessions receive.

use crate::bootstrap::Deadline;
use crate::chroot::path;
use crate::client::Transport;
use crate::error::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Kind of request a session received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exists,
    Create,
    GetData,
    SetData,
    Delete,
    GetChildren,
}

/// One request observed by the tree, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub path: String,
}

#[derive(Default)]
struct Shared {
    /// Node data keyed by absolute path. The root is always present.
    nodes: RwLock<BTreeMap<String, Vec<u8>>>,
    /// `None` unless recording was requested.
    calls: Option<Mutex<Vec<Call>>>,
    open_sessions: AtomicUsize,
}

/// Shared in-memory node tree.
#[derive(Clone)]
pub struct MemoryTree {
    shared: Arc<Shared>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Create a tree containing only the root.
    pub fn new() -> Self {
        Self::with_shared(Shared::default())
    }

    /// Like [`MemoryTree::new`], but every request received through a
    /// session is logged and visible via [`MemoryTree::calls`].
    pub fn recording() -> Self {
        Self::with_shared(Shared {
            calls: Some(Mutex::new(Vec::new())),
            ..Shared::default()
        })
    }

    fn with_shared(shared: Shared) -> Self {
        shared.nodes.write().insert("/".to_string(), Vec::new());
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Open a session against this tree.
    pub fn session(&self) -> MemorySession {
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        MemorySession {
            tree: self.clone(),
            closed: false,
            latency: None,
            deadline: None,
        }
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// Every request received through sessions so far. Always empty for a
    /// tree that is not recording.
    pub fn calls(&self) -> Vec<Call> {
        self.shared
            .calls
            .as_ref()
            .map(|calls| calls.lock().clone())
            .unwrap_or_default()
    }

    /// Number of received requests of kind `op`.
    pub fn count(&self, op: Op) -> usize {
        self.shared
            .calls
            .as_ref()
            .map_or(0, |calls| calls.lock().iter().filter(|c| c.op == op).count())
    }

    /// Check whether a node exists.
    pub fn exists(&self, path: &str) -> Result<bool> {
        path::validate(path)?;
        Ok(self.shared.nodes.read().contains_key(path))
    }

    /// Create a node. The parent must exist.
    pub fn create(&self, path: &str, data: &[u8]) -> Result<String> {
        path::validate(path)?;
        let parent = path::parent(path).ok_or_else(|| Error::NodeExists {
            path: path.to_string(),
        })?;

        let mut nodes = self.shared.nodes.write();
        if nodes.contains_key(path) {
            return Err(Error::NodeExists {
                path: path.to_string(),
            });
        }
        if !nodes.contains_key(parent) {
            return Err(Error::NoNode {
                path: path.to_string(),
            });
        }
        nodes.insert(path.to_string(), data.to_vec());
        Ok(path.to_string())
    }

    /// Read a node's data.
    pub fn get(&self, path: &str) -> Result<Vec<u8>> {
        path::validate(path)?;
        self.shared
            .nodes
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NoNode {
                path: path.to_string(),
            })
    }

    /// Replace a node's data.
    pub fn set(&self, path: &str, data: &[u8]) -> Result<()> {
        path::validate(path)?;
        match self.shared.nodes.write().get_mut(path) {
            Some(existing) => {
                *existing = data.to_vec();
                Ok(())
            }
            None => Err(Error::NoNode {
                path: path.to_string(),
            }),
        }
    }

    /// Delete a childless node. The root cannot be deleted.
    pub fn delete(&self, path: &str) -> Result<()> {
        path::validate(path)?;
        if path == "/" {
            return Err(Error::invalid_path(path, "cannot delete the root"));
        }

        let mut nodes = self.shared.nodes.write();
        if !nodes.contains_key(path) {
            return Err(Error::NoNode {
                path: path.to_string(),
            });
        }
        if has_children(&nodes, path) {
            return Err(Error::NotEmpty {
                path: path.to_string(),
            });
        }
        nodes.remove(path);
        Ok(())
    }

    /// Names of a node's children, sorted.
    pub fn children(&self, path: &str) -> Result<Vec<String>> {
        path::validate(path)?;
        let nodes = self.shared.nodes.read();
        if !nodes.contains_key(path) {
            return Err(Error::NoNode {
                path: path.to_string(),
            });
        }

        let prefix = child_prefix(path);
        Ok(nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let name = &key[prefix.len()..];
                (!name.is_empty() && !name.contains('/')).then(|| name.to_string())
            })
            .collect())
    }

    /// Create `path` and any missing ancestors.
    pub fn mkdir_p(&self, path: &str) -> Result<()> {
        path::validate(path)?;
        for node in path::ancestors(path) {
            match self.create(node, &[]) {
                Ok(_) => {}
                Err(e) if e.is_node_exists() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn record(&self, op: Op, path: &str) {
        if let Some(calls) = &self.shared.calls {
            calls.lock().push(Call {
                op,
                path: path.to_string(),
            });
        }
    }
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

fn has_children(nodes: &BTreeMap<String, Vec<u8>>, path: &str) -> bool {
    let prefix = child_prefix(path);
    nodes
        .range(prefix.clone()..)
        .next()
        .is_some_and(|(key, _)| key.starts_with(&prefix))
}

/// One connection to a [`MemoryTree`].
pub struct MemorySession {
    tree: MemoryTree,
    closed: bool,
    latency: Option<Duration>,
    deadline: Option<Deadline>,
}

impl MemorySession {
    /// Delay every request by `latency`, simulating a slow network.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn begin(&self, op: Op, path: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.tree.record(op, path);
        if let Some(latency) = self.latency {
            // A request that can't complete before the deadline times out.
            if let Some(deadline) = self.deadline {
                let remaining = deadline.remaining()?;
                if latency >= remaining {
                    std::thread::sleep(remaining);
                    return Err(deadline.timeout_error());
                }
            }
            std::thread::sleep(latency);
        }
        Ok(())
    }
}

impl Transport for MemorySession {
    fn exists(&mut self, path: &str) -> Result<bool> {
        self.begin(Op::Exists, path)?;
        self.tree.exists(path)
    }

    fn create(&mut self, path: &str, data: &[u8]) -> Result<String> {
        self.begin(Op::Create, path)?;
        self.tree.create(path, data)
    }

    fn get_data(&mut self, path: &str) -> Result<Vec<u8>> {
        self.begin(Op::GetData, path)?;
        self.tree.get(path)
    }

    fn set_data(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.begin(Op::SetData, path)?;
        self.tree.set(path, data)
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.begin(Op::Delete, path)?;
        self.tree.delete(path)
    }

    fn get_children(&mut self, path: &str) -> Result<Vec<String>> {
        self.begin(Op::GetChildren, path)?;
        self.tree.children(path)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.tree.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn set_deadline(&mut self, deadline: Option<Deadline>) {
        self.deadline = deadline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_parent() {
        let tree = MemoryTree::new();
        assert!(matches!(tree.create("/a/b", b""), Err(Error::NoNode { .. })));
        tree.create("/a", b"").unwrap();
        tree.create("/a/b", b"x").unwrap();
        assert!(matches!(tree.create("/a/b", b""), Err(Error::NodeExists { .. })));
        assert!(matches!(tree.create("/", b""), Err(Error::NodeExists { .. })));
    }

    #[test]
    fn test_children_are_direct_only() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/a/b/c").unwrap();
        tree.mkdir_p("/a/d").unwrap();
        tree.mkdir_p("/ab").unwrap();

        assert_eq!(tree.children("/").unwrap(), vec!["a", "ab"]);
        assert_eq!(tree.children("/a").unwrap(), vec!["b", "d"]);
        assert!(tree.children("/a/b/c").unwrap().is_empty());
        assert!(matches!(tree.children("/zz"), Err(Error::NoNode { .. })));
    }

    #[test]
    fn test_delete_rules() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/a/b").unwrap();
        tree.create("/ab", b"").unwrap();

        assert!(matches!(tree.delete("/a"), Err(Error::NotEmpty { .. })));
        assert!(matches!(tree.delete("/missing"), Err(Error::NoNode { .. })));
        assert!(matches!(tree.delete("/"), Err(Error::InvalidPath { .. })));

        tree.delete("/a/b").unwrap();
        tree.delete("/a").unwrap();
        assert!(tree.exists("/ab").unwrap());
    }

    #[test]
    fn test_get_and_set() {
        let tree = MemoryTree::new();
        tree.create("/a", b"one").unwrap();
        tree.set("/a", b"two").unwrap();
        assert_eq!(tree.get("/a").unwrap(), b"two");
        assert!(matches!(tree.set("/b", b""), Err(Error::NoNode { .. })));
    }

    #[test]
    fn test_sessions_share_tree_and_record_calls() {
        let tree = MemoryTree::recording();
        let mut first = tree.session();
        let mut second = tree.session();
        assert_eq!(tree.open_sessions(), 2);

        first.create("/shared", b"v").unwrap();
        assert_eq!(second.get_data("/shared").unwrap(), b"v");
        assert_eq!(tree.count(Op::Create), 1);
        assert_eq!(
            tree.calls()[1],
            Call {
                op: Op::GetData,
                path: "/shared".into()
            }
        );

        first.close().unwrap();
        first.close().unwrap();
        assert_eq!(tree.open_sessions(), 1);
        assert!(matches!(first.exists("/"), Err(Error::Closed)));
        second.close().unwrap();
        assert_eq!(tree.open_sessions(), 0);
    }

    #[test]
    fn test_plain_tree_keeps_no_call_log() {
        let tree = MemoryTree::new();
        let mut session = tree.session();
        for _ in 0..1000 {
            assert!(session.exists("/").unwrap());
        }
        session.create("/a", b"").unwrap();

        assert!(tree.calls().is_empty());
        assert_eq!(tree.count(Op::Exists), 0);
        assert!(tree.shared.calls.is_none());
    }

    #[test]
    fn test_latency_past_deadline_times_out() {
        let tree = MemoryTree::new();
        let mut session = tree.session().with_latency(Duration::from_millis(200));
        session.set_deadline(Some(Deadline::after(Duration::from_millis(20))));
        assert!(matches!(
            session.exists("/"),
            Err(Error::ConnectionTimeout { .. })
        ));

        session.set_deadline(None);
        assert!(session.exists("/").unwrap());
    }
}
