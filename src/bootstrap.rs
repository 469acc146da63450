//! Connection bootstrap.
//!
//! [`bootstrap_with`] runs the whole sequence: parse the connection string,
//! merge the chroot option, open an unscoped transport, resolve the chroot
//! against it and hand back a [`Client`] bound to the result. Any failure
//! after the transport is opened closes it before the error is returned.

use crate::address::{Address, ConnectString};
use crate::chroot::{merge, resolve, ChrootOption};
use crate::client::{Client, TcpTransport, Transport};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Default overall bootstrap timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Caller options for [`connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Chroot option; `None` uses the connection string's path (if any) in
    /// create mode.
    pub chroot: Option<ChrootOption>,

    /// Overall bootstrap timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            chroot: None,
            timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

impl ConnectOptions {
    /// Set the chroot option.
    pub fn with_chroot(mut self, chroot: ChrootOption) -> Self {
        self.chroot = Some(chroot);
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fixed point in time by which bootstrap must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Time left, or [`Error::ConnectionTimeout`] once it has passed.
    pub fn remaining(&self) -> Result<Duration> {
        match self.at.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(left),
            _ => Err(self.timeout_error()),
        }
    }

    /// The error reported when this deadline is missed.
    pub fn timeout_error(&self) -> Error {
        Error::ConnectionTimeout {
            timeout: self.budget,
        }
    }
}

/// Connect over TCP and bootstrap the chroot.
pub fn connect(raw: &str, options: &ConnectOptions) -> Result<Client<TcpTransport>> {
    bootstrap_with(raw, options, TcpTransport::connect)
}

/// Bootstrap using a caller-supplied transport constructor.
///
/// `connector` receives the parsed servers in their listed order and the
/// bootstrap deadline, and returns an open, unscoped transport.
pub fn bootstrap_with<T, F>(raw: &str, options: &ConnectOptions, connector: F) -> Result<Client<T>>
where
    T: Transport,
    F: FnOnce(&[Address], Option<Deadline>) -> Result<T>,
{
    let connect_string = ConnectString::parse(raw)?;
    let target = merge(
        connect_string.embedded_path.as_deref(),
        options.chroot.as_ref(),
    )?;
    let deadline = options.timeout.map(Deadline::after);

    tracing::info!(
        servers = %connect_string.hosts(),
        chroot = ?target.as_ref().map(|t| &t.path),
        mode = ?target.as_ref().map(|t| t.mode),
        "bootstrapping connection"
    );

    let mut transport = connector(&connect_string.addresses, deadline)?;
    transport.set_deadline(deadline);

    let outcome = resolve(&mut Bounded::new(&mut transport, deadline), target.as_ref());

    match outcome {
        Ok(chroot) => {
            transport.set_deadline(None);
            tracing::info!(chroot = %chroot, "connection ready");
            Ok(Client::scoped(transport, chroot))
        }
        Err(e) => {
            tracing::debug!(error = %e, "bootstrap failed, closing connection");
            if let Err(close_err) = transport.close() {
                tracing::warn!(error = %close_err, "failed to close connection after bootstrap failure");
            }
            Err(e)
        }
    }
}

/// Transport adapter that refuses calls once the deadline has passed.
struct Bounded<'a, T: Transport + ?Sized> {
    inner: &'a mut T,
    deadline: Option<Deadline>,
}

impl<'a, T: Transport + ?Sized> Bounded<'a, T> {
    fn new(inner: &'a mut T, deadline: Option<Deadline>) -> Self {
        Self { inner, deadline }
    }

    fn check(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) => deadline.remaining().map(|_| ()),
            None => Ok(()),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Bounded<'_, T> {
    fn exists(&mut self, path: &str) -> Result<bool> {
        self.check()?;
        self.inner.exists(path)
    }

    fn create(&mut self, path: &str, data: &[u8]) -> Result<String> {
        self.check()?;
        self.inner.create(path, data)
    }

    fn get_data(&mut self, path: &str) -> Result<Vec<u8>> {
        self.check()?;
        self.inner.get_data(path)
    }

    fn set_data(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.check()?;
        self.inner.set_data(path, data)
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(path)
    }

    fn get_children(&mut self, path: &str) -> Result<Vec<String>> {
        self.check()?;
        self.inner.get_children(path)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn set_deadline(&mut self, deadline: Option<Deadline>) {
        self.inner.set_deadline(deadline)
    }
}
