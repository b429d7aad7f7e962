//! Proxy configuration.
//!
//! Every field has a default, so a missing file section (or no file at all)
//! yields the protocol's standard ports and timeout.

use std::path::Path;
use std::time::Duration;

use meshwire::Backend;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Backend addressing and exchange timing.
    pub backend: BackendConfig,

    /// Which optional polls run and how.
    pub poll: PollConfig,
}

impl ProxyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub controller_port: u16,
    pub aggregator_port: u16,
    /// Deadline for one request/response exchange, connect included.
    pub exchange_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            controller_port: Backend::Controller.default_port(),
            aggregator_port: Backend::Aggregator.default_port(),
            exchange_timeout_ms: 4000,
        }
    }
}

impl BackendConfig {
    pub fn port(&self, backend: Backend) -> u16 {
        match backend {
            Backend::Controller => self.controller_port,
            Backend::Aggregator => self.aggregator_port,
        }
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Also ask each aggregator for its status report on every poll.
    pub aggregator_status_report: bool,

    /// Request scan status without per-responder detail.
    pub scan_concise: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
