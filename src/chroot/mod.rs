//! Chroot policy and resolution.
//!
//! [`policy::merge`] turns the connection string's embedded path and the
//! caller's [`ChrootOption`] into a [`ResolvedTarget`]; [`resolver::resolve`]
//! reconciles that target against the remote tree.

pub mod path;
pub mod policy;
pub mod resolver;

pub use policy::{merge, ChrootMode, ChrootOption, ResolvedTarget};
pub use resolver::{ensure_path, resolve};
