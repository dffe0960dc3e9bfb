//! TOML configuration for the admin application.
//!
//! Read from `admin.toml` in the platform config directory (see
//! [`screencast_core::config_dir`]).  A missing file means "all defaults".
//!
//! ```toml
//! [admin]
//! log_level = "debug"
//!
//! [network]
//! bind_address = "0.0.0.0"
//! discovery_port = 8888
//! control_port = 7777
//! media_port = 9999
//!
//! [session]
//! control_timeout_ms = 3000
//! shutdown_timeout_secs = 10
//!
//! [discovery]
//! sender_expiry_secs = 30
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section is
//! `#[serde(default)]`, so an empty or partial file is valid.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use screencast_core::protocol::{DEFAULT_CONTROL_PORT, DEFAULT_DISCOVERY_PORT, DEFAULT_MEDIA_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "admin.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level admin configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
}

/// General admin behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ports and bind address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Address the discovery and media sockets bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// UDP port beacons arrive on.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// TCP port of each sender's control listener.
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// TCP port of the admin's media endpoint.
    #[serde(default = "default_media_port")]
    pub media_port: u16,
}

/// Session manager timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Budget for each of connect and write when delivering a command.
    #[serde(default = "default_control_timeout_ms")]
    pub control_timeout_ms: u64,
    /// Upper bound on stopping the active stream at exit.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

/// Discovery registry behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySettings {
    /// Forget senders silent for this long.  Absent keeps them forever.
    #[serde(default)]
    pub sender_expiry_secs: Option<u64>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}
fn default_media_port() -> u16 {
    DEFAULT_MEDIA_PORT
}
fn default_control_timeout_ms() -> u64 {
    3000
}
fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            discovery_port: default_discovery_port(),
            control_port: default_control_port(),
            media_port: default_media_port(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            control_timeout_ms: default_control_timeout_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn discovery_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.discovery_port)
    }

    pub fn media_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.media_port)
    }
}

impl SessionSettings {
    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl DiscoverySettings {
    pub fn sender_expiry(&self) -> Option<Duration> {
        self.sender_expiry_secs.map(Duration::from_secs)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to `admin.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    screencast_core::config_dir::platform_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from the platform directory, or defaults if absent.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
