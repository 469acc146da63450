//! Client configuration.
//!
//! Default connection settings live in `<config dir>/zkchroot/config.toml`.
//! A missing file means defaults; command-line flags override both.

use crate::bootstrap::{ConnectOptions, DEFAULT_CONNECT_TIMEOUT};
use crate::chroot::ChrootOption;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name for config file storage.
const APP_NAME: &str = "zkchroot";

/// Config file name.
const CONFIG_FILENAME: &str = "config.toml";

/// Connection string used when none is configured.
pub const DEFAULT_CONNECT_STRING: &str = "localhost:2181";

/// Persistent client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Configuration format version.
    #[serde(default = "default_version")]
    pub version: u8,

    /// Servers (and optional chroot suffix) to connect to.
    #[serde(default = "default_connect_string")]
    pub connect_string: String,

    /// Chroot option: `create`, `check`, `ignore` or an absolute path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroot: Option<ChrootOption>,

    /// Overall bootstrap timeout, e.g. `"10s"` or `"1m 30s"`.
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,
}

fn default_version() -> u8 {
    1
}

fn default_connect_string() -> String {
    DEFAULT_CONNECT_STRING.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            connect_string: default_connect_string(),
            chroot: None,
            timeout: default_timeout(),
        }
    }
}

impl ClientConfig {
    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(CONFIG_FILENAME))
            .ok_or_else(|| Error::ConfigLoad("no config directory on this platform".into()))
    }

    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::ConfigLoad(format!("{}: {}", path.display(), e))),
        };

        toml::from_str(&contents).map_err(|e| Error::ConfigLoad(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigSave(format!("{}: {}", parent.display(), e)))?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| Error::ConfigSave(e.to_string()))?;
        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("{}: {}", path.display(), e)))
    }

    /// Connect options described by this configuration.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            chroot: self.chroot.clone(),
            timeout: Some(self.timeout),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
