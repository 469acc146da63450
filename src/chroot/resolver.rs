//! Chroot resolution against the remote tree.

use crate::chroot::path::ancestors;
use crate::chroot::policy::{ChrootMode, ResolvedTarget};
use crate::client::Transport;
use crate::error::{Error, Result};

/// Reconcile `target` with the remote tree, returning the chroot to bind.
///
/// - No target: `""` (unscoped), no remote calls.
/// - [`ChrootMode::Create`]: one `exists`; if absent, every missing
///   component is created.
/// - [`ChrootMode::Check`]: one `exists`; absent is
///   [`Error::ChrootPathDoesNotExist`].
/// - [`ChrootMode::Ignore`]: no remote calls.
///
/// Remote errors are returned as-is; nothing is retried here.
pub fn resolve<T: Transport + ?Sized>(
    transport: &mut T,
    target: Option<&ResolvedTarget>,
) -> Result<String> {
    let Some(target) = target else {
        tracing::debug!("no chroot requested");
        return Ok(String::new());
    };
    let path = target.path.as_str();

    match target.mode {
        ChrootMode::Create => {
            if transport.exists(path)? {
                tracing::debug!(path = %path, "chroot already exists");
            } else {
                let created = ensure_path(transport, path)?;
                tracing::info!(path = %path, created, "created chroot path");
            }
        }
        ChrootMode::Check => {
            if !transport.exists(path)? {
                return Err(Error::ChrootPathDoesNotExist {
                    path: path.to_string(),
                });
            }
            tracing::debug!(path = %path, "chroot exists");
        }
        ChrootMode::Ignore => {
            tracing::warn!(
                path = %path,
                "chroot existence not verified; operations fail at use time if it is missing"
            );
        }
    }

    Ok(path.to_string())
}

/// Create `path` and every missing ancestor, shortest first.
///
/// A node that already exists (including one created concurrently by
/// another client) counts as success. Returns how many nodes this call
/// created.
pub fn ensure_path<T: Transport + ?Sized>(transport: &mut T, path: &str) -> Result<usize> {
    ancestors(path).try_fold(0, |created, node| match transport.create(node, &[]) {
        Ok(_) => {
            tracing::debug!(path = %node, "created node");
            Ok(created + 1)
        }
        Err(e) if e.is_node_exists() => Ok(created),
        Err(e) => Err(e),
    })
}
