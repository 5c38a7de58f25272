//! Configuration for FLS.
//!
//! Loaded from TOML with per-section defaults. A missing file falls back to
//! defaults; a malformed file is an error surfaced at startup. CLI flags
//! override file values in the binaries.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid console interval {value:?}: {source}")]
    Interval {
        value: String,
        source: humantime::DurationError,
    },
}

/// Top-level FLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlsConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stress: StressConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

impl FlsConfig {
    /// Load configuration from an explicit path, or the default location.
    ///
    /// A missing file (explicit or default) yields [`FlsConfig::default`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Default config file location: `{config_dir}/fls/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fls").join("config.toml"))
}

/// HTTP listener settings for the instance daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressConfig {
    /// Worker count used when a start request does not specify one.
    /// Absent means the host's logical core count.
    #[serde(default)]
    pub default_workers: Option<u32>,
    /// How long `stop` waits for workers to acknowledge before detaching
    /// them.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl StressConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            default_workers: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// Tag-based fleet discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    #[serde(default = "default_tag_value")]
    pub tag_value: String,
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag_key: default_tag_key(),
            tag_value: default_tag_value(),
            timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

/// Operator console settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// The fleet's single logical endpoint (the load balancer URL).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Number of independent polls per aggregation burst.
    #[serde(default = "default_burst")]
    pub burst: usize,
    /// Refresh cadence for `fls watch`, humantime format (e.g. "3s").
    #[serde(default = "default_interval")]
    pub interval: String,
}

impl ConsoleConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.interval).map_err(|source| ConfigError::Interval {
            value: self.interval.clone(),
            source,
        })
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            burst: default_burst(),
            interval: default_interval(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_grace_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_tag_key() -> String {
    "fleet".to_string()
}

fn default_tag_value() -> String {
    "stress".to_string()
}

fn default_discovery_timeout_ms() -> u64 {
    5000
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_burst() -> usize {
    8
}

fn default_interval() -> String {
    "3s".to_string()
}
