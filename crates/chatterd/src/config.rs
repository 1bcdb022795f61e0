//! Server configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config`)
//! 3. The listen port from `TCP_PORT` / `--port`

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatter_core::{ConfigError, DEFAULT_FRAGMENT_CAPACITY, DEFAULT_HISTORY_CAPACITY};
use serde::Deserialize;
use thiserror::Error;

/// Default listen address when nothing else is configured.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Pending messages a client may have queued before new ones are dropped.
///
/// One more than the history, so a full replay and the join both fit.
pub const DEFAULT_OUTBOUND_QUEUE: usize = DEFAULT_HISTORY_CAPACITY + 1;

/// Seconds of silence after which a client is evicted.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Seconds between idle scans.
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 1;

/// Runtime settings for the chat daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`
    pub listen: String,

    /// Fragments folded into one message
    pub fragment_capacity: usize,

    /// Messages kept for replay to new clients
    pub history_capacity: usize,

    /// Per-client outbound queue bound (drop-on-overflow)
    pub outbound_queue: usize,

    /// Inactivity threshold in seconds
    pub idle_timeout_secs: u64,

    /// Reaper tick in seconds
    pub reap_interval_secs: u64,

    /// Optional idle flush of a partially filled fragment buffer.
    /// Unset keeps the pure capacity-triggered policy.
    pub fragment_flush_after_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            fragment_capacity: DEFAULT_FRAGMENT_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            reap_interval_secs: DEFAULT_REAP_INTERVAL_SECS,
            fragment_flush_after_ms: None,
        }
    }
}

impl ServerConfig {
    /// Loads a config file, falling back to defaults for missing keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the listen address from a port string (`8080`, `:8080`, `host:8080`).
    pub fn with_port(mut self, port: &str) -> Result<Self, ConfigError> {
        self.listen = normalize_listen(port)?;
        Ok(self)
    }

    /// Checks every bound and interval is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fragment_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "fragment_capacity",
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "history_capacity",
            });
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "outbound_queue",
            });
        }
        if self.outbound_queue <= self.history_capacity {
            return Err(ConfigError::QueueTooSmall {
                outbound_queue: self.outbound_queue,
                history_capacity: self.history_capacity,
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "idle_timeout_secs",
            });
        }
        if self.reap_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "reap_interval_secs",
            });
        }
        if self.fragment_flush_after_ms == Some(0) {
            return Err(ConfigError::ZeroDuration {
                field: "fragment_flush_after_ms",
            });
        }
        Ok(())
    }

    /// Resolves `listen` to a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .to_socket_addrs()
            .map_err(|e| ConfigError::InvalidListenAddr(format!("{}: {e}", self.listen)))?
            .next()
            .ok_or_else(|| ConfigError::InvalidListenAddr(self.listen.clone()))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn fragment_flush_after(&self) -> Option<Duration> {
        self.fragment_flush_after_ms.map(Duration::from_millis)
    }
}

/// Turns a port string into a bindable `host:port` string.
///
/// A bare port or `:port` binds all IPv4 interfaces.
fn normalize_listen(input: &str) -> Result<String, ConfigError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ConfigError::MissingPort);
    }

    let (host, port) = match input.rsplit_once(':') {
        Some((host, port)) => (host, port),
        None => ("", input),
    };

    port.parse::<u16>()
        .map_err(|_| ConfigError::InvalidListenAddr(input.to_string()))?;

    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(format!("{host}:{port}"))
}

/// Errors that can occur while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config {path}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigError),
}
