//! Connection string parsing.
//!
//! A connection string is a comma-separated list of `host:port` servers,
//! optionally followed by a chroot path that applies to the whole list:
//!
//! ```text
//! zk1:2181,zk2:2181,[::1]:2181/app/prod
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A single server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Host name or IP literal (IPv6 without brackets).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Create a new address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidConnectionString(
                "empty host entry".to_string(),
            ));
        }

        let (host, port) = token.rsplit_once(':').ok_or_else(|| {
            Error::InvalidConnectionString(format!("'{}' is missing a port", token))
        })?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| {
                Error::InvalidConnectionString(format!("unbalanced brackets in '{}'", token))
            })?,
            None if host.contains(':') => {
                return Err(Error::InvalidConnectionString(format!(
                    "IPv6 host in '{}' must be bracketed",
                    token
                )))
            }
            None => host,
        };

        if host.is_empty() {
            return Err(Error::InvalidConnectionString(format!(
                "'{}' is missing a host",
                token
            )));
        }

        let port: u16 = port.parse().map_err(|_| {
            Error::InvalidConnectionString(format!("'{}' has an invalid port", token))
        })?;
        if port == 0 {
            return Err(Error::InvalidConnectionString(format!(
                "'{}' has port 0",
                token
            )));
        }

        Ok(Address::new(host, port))
    }
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectString {
    /// Servers in the order they were listed.
    pub addresses: Vec<Address>,
    /// Chroot path appended to the server list, if any.
    pub embedded_path: Option<String>,
}

impl ConnectString {
    /// Parse a raw connection string.
    ///
    /// Everything from the first `/` on is the embedded chroot path; a
    /// trailing `/` on it is dropped (the root stays `/`). Only one slash
    /// is dropped, so `//` is an empty segment, not the root.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidConnectionString(
                "connection string is empty".to_string(),
            ));
        }

        let (hosts, embedded_path) = match raw.find('/') {
            Some(idx) => (&raw[..idx], Some(&raw[idx..])),
            None => (raw, None),
        };

        let addresses = hosts
            .split(',')
            .map(Address::from_str)
            .collect::<Result<Vec<_>>>()?;

        let embedded_path = embedded_path
            .map(|path| {
                let path = crate::chroot::path::strip_trailing_slash(path);
                crate::chroot::path::validate(path).map_err(|e| {
                    Error::InvalidConnectionString(format!("bad chroot suffix: {}", e))
                })?;
                Ok::<_, Error>(path.to_string())
            })
            .transpose()?;

        tracing::trace!(
            servers = addresses.len(),
            embedded_path = ?embedded_path,
            "parsed connection string"
        );

        Ok(Self {
            addresses,
            embedded_path,
        })
    }

    /// The server list rendered back as `host:port,host:port`.
    pub fn hosts(&self) -> String {
        self.addresses
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for ConnectString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConnectString::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_host_without_path() {
        let cs = ConnectString::parse("localhost:2181").unwrap();
        assert_eq!(cs.addresses, vec![Address::new("localhost", 2181)]);
        assert!(cs.embedded_path.is_none());
    }

    #[test]
    fn test_parse_multiple_hosts_preserves_order() {
        let cs = ConnectString::parse("zk3:2183, zk1:2181,zk2:2182").unwrap();
        let hosts: Vec<String> = cs.addresses.iter().map(|a| a.to_string()).collect();
        assert_eq!(hosts, vec!["zk3:2183", "zk1:2181", "zk2:2182"]);
        assert!(cs.embedded_path.is_none());
    }

    #[test]
    fn test_parse_embedded_path() {
        let cs = ConnectString::parse("localhost:2181/a/b").unwrap();
        assert_eq!(cs.hosts(), "localhost:2181");
        assert_eq!(cs.embedded_path.as_deref(), Some("/a/b"));

        let cs = ConnectString::parse("zk1:2181,zk2:2181/zktest/path/").unwrap();
        assert_eq!(cs.addresses.len(), 2);
        assert_eq!(cs.embedded_path.as_deref(), Some("/zktest/path"));

        let cs = ConnectString::parse("localhost:2181/").unwrap();
        assert_eq!(cs.embedded_path.as_deref(), Some("/"));
    }

    #[test]
    fn test_parse_ipv6() {
        let cs = ConnectString::parse("[::1]:2181,[fe80::1]:2182/app").unwrap();
        assert_eq!(cs.addresses[0], Address::new("::1", 2181));
        assert_eq!(cs.addresses[1].to_string(), "[fe80::1]:2182");
        assert_eq!(cs.embedded_path.as_deref(), Some("/app"));
    }

    #[test]
    fn test_parse_invalid() {
        let invalid = [
            ("", "empty"),
            ("   ", "blank"),
            ("localhost", "no port"),
            ("localhost:", "empty port"),
            ("localhost:abc", "non-numeric port"),
            ("localhost:70000", "port out of range"),
            ("localhost:0", "port zero"),
            (":2181", "no host"),
            ("a:1,,b:2", "empty entry"),
            ("a:1,b", "second host without port"),
            ("::1:2181", "unbracketed ipv6"),
            ("[::1:2181", "unbalanced bracket"),
            ("/app", "path only"),
            ("a:1/app//x", "bad chroot suffix"),
            ("host:2181//", "double slash suffix"),
            ("host:2181/app//", "double trailing slash"),
        ];
        for (raw, desc) in invalid {
            assert!(
                matches!(
                    ConnectString::parse(raw),
                    Err(Error::InvalidConnectionString(_))
                ),
                "expected '{}' ({}) to be rejected",
                raw,
                desc
            );
        }
    }
}
