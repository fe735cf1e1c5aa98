//! Bridge configuration.
//!
//! The host hands over a [`BridgeConfig`] (from a TOML file or the command
//! line). It is validated into a [`ServerConfig`] before any socket is
//! touched; a config change always rebuilds the server.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port the extension connects to out of the box.
pub const DEFAULT_PORT: u16 = 8082;

/// Lowest port the bridge will listen on.
pub const MIN_PORT: u16 = 1024;

pub const DEFAULT_HEARTBEAT_SECS: u64 = 20;

/// Configuration as supplied by the host. Every field is optional in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub port: Option<u16>,
    pub host: IpAddr,
    pub heartbeat_interval_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// A validated, immutable server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub(crate) addr: SocketAddr,
    pub(crate) heartbeat: Duration,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Loopback on an OS-assigned port, skipping validation.
    #[cfg(test)]
    pub(crate) fn ephemeral(heartbeat: Duration) -> Self {
        Self {
            addr: (Ipv4Addr::LOCALHOST, 0).into(),
            heartbeat,
        }
    }
}

impl TryFrom<&BridgeConfig> for ServerConfig {
    type Error = ConfigError;

    fn try_from(config: &BridgeConfig) -> Result<Self, Self::Error> {
        let port = config.port.ok_or(ConfigError::MissingPort)?;
        if port < MIN_PORT {
            return Err(ConfigError::PortOutOfRange(port));
        }
        if config.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        Ok(Self {
            addr: SocketAddr::new(config.host, port),
            heartbeat: Duration::from_secs(config.heartbeat_interval_secs),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("port is not configured")]
    MissingPort,
    #[error("port {0} is outside 1024-65535")]
    PortOutOfRange(u16),
    #[error("heartbeat interval must be at least one second")]
    ZeroHeartbeat,
}
