//! Server configuration loader and validator
//!
//! Loads relay settings from TOML (configs/server.toml by default). Every
//! field has a default so an absent file yields a working configuration.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::dsu::constants::DSU_PORT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the UDP socket binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// UDP port (26760 is the port DSU clients expect)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Broadcast tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Controller poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DSU_PORT
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    10
}

impl ServerConfig {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new("configs/server.toml");
        if path.exists() {
            Self::from_path(path)
        } else {
            warn!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded server config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "bind_address '{}' is not an IP address",
                self.bind_address
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 26760);
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn parses_partial_toml() {
        let config: ServerConfig = toml::from_str("port = 26761\n").unwrap();
        assert_eq!(config.port, 26761);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn rejects_bad_bind_address() {
        let config = ServerConfig {
            bind_address: "not-an-ip".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_intervals() {
        let mut config = ServerConfig::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        config.tick_interval_ms = 10;
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
