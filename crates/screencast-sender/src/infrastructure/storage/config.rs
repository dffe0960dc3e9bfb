//! TOML configuration for the sender application.
//!
//! Read from `sender.toml` in the platform config directory (see
//! [`screencast_core::config_dir`]).  A missing file means "all defaults".
//!
//! ```toml
//! [sender]
//! log_level = "info"
//! shutdown_timeout_secs = 10
//!
//! [network]
//! admin_address = "192.168.1.10"
//! bind_address = "0.0.0.0"
//! discovery_port = 8888
//! control_port = 7777
//! media_port = 9999
//!
//! [beacon]
//! interval_secs = 5
//!
//! [control]
//! read_timeout_ms = 3000
//!
//! [media]
//! frame_rate = 30
//! frame_size = 4096
//! connect_timeout_ms = 3000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use screencast_core::protocol::{DEFAULT_CONTROL_PORT, DEFAULT_DISCOVERY_PORT, DEFAULT_MEDIA_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "sender.toml";

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

/// Top-level sender configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub beacon: BeaconConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// General sender behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SenderConfig {
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on stopping the active stream at exit.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

/// Where the admin is and which ports to use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// The admin's IP address; beacons and media go here.
    #[serde(default = "default_admin_address")]
    pub admin_address: IpAddr,
    /// Address the control listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default = "default_media_port")]
    pub media_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeaconConfig {
    #[serde(default = "default_beacon_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    /// How long an admin may take to send its command and close.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Size in bytes of each synthetic frame.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_shutdown_timeout_secs() -> u64 {
    10
}
fn default_admin_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
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
fn default_beacon_interval_secs() -> u64 {
    5
}
fn default_read_timeout_ms() -> u64 {
    3000
}
fn default_frame_rate() -> u32 {
    30
}
fn default_frame_size() -> usize {
    4096
}
fn default_connect_timeout_ms() -> u64 {
    3000
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            admin_address: default_admin_address(),
            bind_address: default_bind_address(),
            discovery_port: default_discovery_port(),
            control_port: default_control_port(),
            media_port: default_media_port(),
        }
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_beacon_interval_secs(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            frame_size: default_frame_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl SenderConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl NetworkConfig {
    /// The admin's discovery endpoint.
    pub fn discovery_target(&self) -> SocketAddr {
        SocketAddr::new(self.admin_address, self.discovery_port)
    }

    /// The admin's media endpoint.
    pub fn media_target(&self) -> SocketAddr {
        SocketAddr::new(self.admin_address, self.media_port)
    }

    /// Where the control listener binds.
    pub fn control_bind(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.control_port)
    }
}

impl BeaconConfig {
    /// Beacon period, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl ControlConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl MediaConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to `sender.toml`.
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
