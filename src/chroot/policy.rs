//! Chroot option merging.

use crate::chroot::path::normalize_chroot;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-supplied chroot option.
///
/// In configuration files and on the command line this is written as
/// `create`, `check`, `ignore`, or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChrootOption {
    /// Create the embedded path if it is missing.
    Create,
    /// Require the embedded path to exist.
    Check,
    /// Use the embedded path without looking at the remote tree.
    Ignore,
    /// Use this path (overriding any embedded one), creating it if missing.
    Path(String),
}

impl FromStr for ChrootOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "create" => Ok(ChrootOption::Create),
            "check" => Ok(ChrootOption::Check),
            "ignore" => Ok(ChrootOption::Ignore),
            p if p.starts_with('/') => Ok(ChrootOption::Path(p.to_string())),
            other => Err(Error::Configuration(format!(
                "chroot option must be create, check, ignore or an absolute path, got '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ChrootOption {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ChrootOption> for String {
    fn from(opt: ChrootOption) -> Self {
        opt.to_string()
    }
}

impl fmt::Display for ChrootOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChrootOption::Create => write!(f, "create"),
            ChrootOption::Check => write!(f, "check"),
            ChrootOption::Ignore => write!(f, "ignore"),
            ChrootOption::Path(p) => write!(f, "{}", p),
        }
    }
}

/// How the resolver reconciles the chroot path with the remote tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChrootMode {
    /// Create missing path components.
    Create,
    /// Fail if the path is missing. Never mutates.
    Check,
    /// Make no remote calls.
    Ignore,
}

impl fmt::Display for ChrootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChrootMode::Create => write!(f, "create"),
            ChrootMode::Check => write!(f, "check"),
            ChrootMode::Ignore => write!(f, "ignore"),
        }
    }
}

/// A normalized chroot path and the mode to resolve it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Absolute path, no trailing slash, never the root.
    pub path: String,
    /// Resolution mode.
    pub mode: ChrootMode,
}

/// Merge the embedded path and explicit option into a target.
///
/// Returns `Ok(None)` when no chroot applies. An explicit path always wins
/// over the embedded one. A mode without any path to apply it to is a
/// [`Error::Configuration`]. A path that normalizes to the root yields no
/// chroot whatever the mode.
pub fn merge(
    embedded_path: Option<&str>,
    option: Option<&ChrootOption>,
) -> Result<Option<ResolvedTarget>> {
    let (raw_path, mode) = match (embedded_path, option) {
        (None, None) => return Ok(None),
        (Some(p), None) => (p, ChrootMode::Create),
        (embedded, Some(ChrootOption::Path(p))) => {
            if let Some(e) = embedded.filter(|e| *e != p.as_str()) {
                tracing::debug!(
                    embedded = %e,
                    explicit = %p,
                    "explicit chroot overrides connection string path"
                );
            }
            (p.as_str(), ChrootMode::Create)
        }
        (Some(p), Some(ChrootOption::Create)) => (p, ChrootMode::Create),
        (Some(p), Some(ChrootOption::Check)) => (p, ChrootMode::Check),
        (Some(p), Some(ChrootOption::Ignore)) => (p, ChrootMode::Ignore),
        (None, Some(opt)) => {
            return Err(Error::Configuration(format!(
                "chroot option '{}' given but the connection string has no chroot path",
                opt
            )))
        }
    };

    Ok(normalize_chroot(raw_path)?.map(|path| ResolvedTarget { path, mode }))
}
