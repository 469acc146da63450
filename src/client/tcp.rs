//! TCP transport speaking the zkchroot frame protocol.
//!
//! This module provides a blocking client for sending requests to a
//! coordination server and receiving responses.

use crate::address::Address;
use crate::bootstrap::Deadline;
use crate::client::Transport;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use zkchroot_protocol::{
    decode_message, read_frame, write_frame, DecodeError, ErrorCode, Request, Response,
    PROTOCOL_VERSION,
};

/// Read timeout once the session is established.
pub const SESSION_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Write timeout once the session is established.
pub const SESSION_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout per socket address when no deadline applies.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking connection to a single server.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    deadline: Option<Deadline>,
    closed: bool,
}

impl TcpTransport {
    /// Connect to the first reachable server in `addresses`.
    ///
    /// Servers are tried in the order given. A server counts as reachable
    /// once it answers a `Ping` with a compatible protocol version.
    pub fn connect(addresses: &[Address], deadline: Option<Deadline>) -> Result<Self> {
        let mut last_error = None;

        for address in addresses {
            let socket_addrs = match (address.host.as_str(), address.port).to_socket_addrs() {
                Ok(addrs) => addrs,
                Err(e) => {
                    tracing::warn!(server = %address, error = %e, "failed to resolve server");
                    last_error = Some(Error::Io(e));
                    continue;
                }
            };

            for socket_addr in socket_addrs {
                let timeout = match deadline {
                    Some(d) => d.remaining()?,
                    None => CONNECT_TIMEOUT,
                };

                match Self::open(socket_addr, timeout, deadline) {
                    Ok(transport) => {
                        tracing::debug!(server = %address, peer = %socket_addr, "connected");
                        return Ok(transport);
                    }
                    Err(e @ Error::ConnectionTimeout { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(server = %address, error = %e, "failed to connect to server");
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => Error::Transport(format!("no server reachable, last error: {}", e)),
            None => Error::Transport("no server addresses to connect to".to_string()),
        })
    }

    fn open(peer: SocketAddr, timeout: Duration, deadline: Option<Deadline>) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&peer, timeout).map_err(|e| match deadline {
            Some(d) if is_timeout(&e) => d.timeout_error(),
            _ => Error::Io(e),
        })?;
        stream.set_nodelay(true).ok();

        let mut transport = Self {
            stream,
            peer,
            deadline,
            closed: false,
        };

        let version = transport.ping()?;
        if version != PROTOCOL_VERSION {
            transport.shutdown();
            return Err(Error::Transport(format!(
                "server speaks protocol version {}, expected {}",
                version, PROTOCOL_VERSION
            )));
        }

        Ok(transport)
    }

    /// Address of the connected server.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Ping the server, returning its protocol version.
    pub fn ping(&mut self) -> Result<u32> {
        match self.request(&Request::Ping)? {
            Response::Pong { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Send a request and receive a response.
    fn request(&mut self, req: &Request) -> Result<Response> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.apply_timeouts()?;

        write_frame(&mut self.stream, req).map_err(|e| self.io_error(e))?;

        let payload = read_frame(&mut self.stream)
            .map_err(|e| self.io_error(e))?
            .ok_or_else(|| Error::Transport("connection closed by server".to_string()))?;

        decode_message(&payload).map_err(|e| Error::Transport(format!("parse failed: {}", e)))
    }

    /// Bound socket I/O by the deadline, or restore session timeouts.
    fn apply_timeouts(&mut self) -> Result<()> {
        let (read, write) = match self.deadline {
            Some(d) => {
                let left = d.remaining()?;
                (left, left)
            }
            None => (SESSION_READ_TIMEOUT, SESSION_WRITE_TIMEOUT),
        };
        self.stream.set_read_timeout(Some(read))?;
        self.stream.set_write_timeout(Some(write))?;
        Ok(())
    }

    fn io_error(&self, err: DecodeError) -> Error {
        match (err, self.deadline) {
            (DecodeError::Io(e), Some(d)) if is_timeout(&e) => d.timeout_error(),
            (other, _) => other.into(),
        }
    }

    fn shutdown(&mut self) {
        self.closed = true;
        self.stream.shutdown(Shutdown::Both).ok();
    }
}

impl Transport for TcpTransport {
    fn exists(&mut self, path: &str) -> Result<bool> {
        match self.request(&Request::Exists {
            path: path.to_string(),
        })? {
            Response::Exists { exists } => Ok(exists),
            other => Err(into_error(other, path)),
        }
    }

    fn create(&mut self, path: &str, data: &[u8]) -> Result<String> {
        match self.request(&Request::Create {
            path: path.to_string(),
            data: data.to_vec(),
        })? {
            Response::Created { path } => Ok(path),
            other => Err(into_error(other, path)),
        }
    }

    fn get_data(&mut self, path: &str) -> Result<Vec<u8>> {
        match self.request(&Request::GetData {
            path: path.to_string(),
        })? {
            Response::Data { data } => Ok(data),
            other => Err(into_error(other, path)),
        }
    }

    fn set_data(&mut self, path: &str, data: &[u8]) -> Result<()> {
        match self.request(&Request::SetData {
            path: path.to_string(),
            data: data.to_vec(),
        })? {
            Response::Ok => Ok(()),
            other => Err(into_error(other, path)),
        }
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        match self.request(&Request::Delete {
            path: path.to_string(),
        })? {
            Response::Ok => Ok(()),
            other => Err(into_error(other, path)),
        }
    }

    fn get_children(&mut self, path: &str) -> Result<Vec<String>> {
        match self.request(&Request::GetChildren {
            path: path.to_string(),
        })? {
            Response::Children { children } => Ok(children),
            other => Err(into_error(other, path)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = match self.request(&Request::Close) {
            Ok(Response::Ok) => Ok(()),
            Ok(other) => Err(unexpected(other)),
            Err(e) => Err(e),
        };
        // The socket goes away even if the server never acknowledged.
        self.shutdown();
        tracing::debug!(peer = %self.peer, "connection closed");
        result
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn set_deadline(&mut self, deadline: Option<Deadline>) {
        self.deadline = deadline;
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if !self.closed {
            self.shutdown();
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn unexpected(resp: Response) -> Error {
    match resp {
        Response::Error { message, .. } => Error::Transport(message),
        other => Error::Transport(format!("unexpected response: {:?}", other)),
    }
}

/// Map a server error response for a request on `path`.
fn into_error(resp: Response, path: &str) -> Error {
    let path = path.to_string();
    match resp {
        Response::Error { code, message } => match code {
            ErrorCode::NoNode => Error::NoNode { path },
            ErrorCode::NodeExists => Error::NodeExists { path },
            ErrorCode::NotEmpty => Error::NotEmpty { path },
            ErrorCode::BadArguments => Error::InvalidPath {
                path,
                reason: message,
            },
            ErrorCode::InvalidRequest => Error::Transport(message),
        },
        other => unexpected(other),
    }
}
