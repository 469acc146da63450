//! Node path helpers: validation, chroot normalization and prefix-joining.

use crate::error::{Error, Result};

/// Check that `path` is a well-formed absolute node path.
///
/// Rules:
/// - Must start with `/`
/// - No trailing `/` (except the root itself)
/// - No empty, `.` or `..` segments
pub fn validate(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "must start with '/'"));
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::invalid_path(path, "must not end with '/'"));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path(path, "must not contain NUL"));
    }

    for segment in path[1..].split('/') {
        match segment {
            "" => return Err(Error::invalid_path(path, "empty segment")),
            "." | ".." => {
                return Err(Error::invalid_path(
                    path,
                    format!("relative segment '{}'", segment),
                ))
            }
            _ => {}
        }
    }

    Ok(())
}

/// Drop one trailing `/` from a non-root path.
///
/// `//` is left as is so validation reports it instead of it collapsing
/// to the root.
pub fn strip_trailing_slash(raw: &str) -> &str {
    match raw.strip_suffix('/') {
        Some(stripped) if stripped.len() > 1 => stripped,
        _ => raw,
    }
}

/// Normalize a chroot path.
///
/// A single trailing `/` is dropped. The root collapses to `None`: scoping
/// to `/` is the same as not scoping at all.
pub fn normalize_chroot(raw: &str) -> Result<Option<String>> {
    let trimmed = strip_trailing_slash(raw);

    validate(trimmed).map_err(|e| Error::Configuration(format!("bad chroot path: {}", e)))?;

    if trimmed == "/" {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

/// Prefix `user_path` with `chroot`.
///
/// An empty chroot is the identity; the user's root maps onto the chroot
/// node itself.
pub fn join(chroot: &str, user_path: &str) -> String {
    if chroot.is_empty() {
        user_path.to_string()
    } else if user_path == "/" {
        chroot.to_string()
    } else {
        format!("{}{}", chroot, user_path)
    }
}

/// Inverse of [`join`] for paths reported back by the server.
pub fn strip(chroot: &str, full_path: &str) -> String {
    if chroot.is_empty() {
        return full_path.to_string();
    }
    match full_path.strip_prefix(chroot) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => full_path.to_string(),
    }
}

/// Every prefix of `path`, shortest first: `/a`, `/a/b`, `/a/b/c`.
///
/// The root yields nothing.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .skip(1)
        .map(move |(idx, _)| &path[..idx])
        .chain(std::iter::once(path).filter(|p| *p != "/"))
}

/// Parent of `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Child path of `parent` named `name`.
pub fn child(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}
