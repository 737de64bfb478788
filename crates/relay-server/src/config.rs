//! Relay server configuration
//!
//! Values come from `RELAY_*` environment variables with defaults matching a
//! local development setup.

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}' (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}

/// Where a configuration value came from, for debugging
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    EnvVar(String),
    Default(String),
}

/// Relay server specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address to bind
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum inbound WebSocket message size in bytes
    pub max_message_size: usize,
    /// Seconds between keep-alive pings; 0 disables them
    pub ping_interval_secs: u64,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3055,
            max_message_size: 64 * 1024 * 1024, // 64MB
            ping_interval_secs: 30,
            log_format: LogFormat::Pretty,
        }
    }
}

const ENV_VARS: [(&str, &str); 5] = [
    ("host", "RELAY_HOST"),
    ("port", "RELAY_PORT"),
    ("max_message_size", "RELAY_MAX_MESSAGE_SIZE"),
    ("ping_interval_secs", "RELAY_PING_INTERVAL"),
    ("log_format", "RELAY_LOG_FORMAT"),
];

impl RelayConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = parse_env("RELAY_HOST", "host", "an IP address", defaults.host)?;
        let port = parse_env("RELAY_PORT", "port", "a port number", defaults.port)?;
        let max_message_size = parse_env(
            "RELAY_MAX_MESSAGE_SIZE",
            "max_message_size",
            "valid number of bytes",
            defaults.max_message_size,
        )?;
        let ping_interval_secs = parse_env(
            "RELAY_PING_INTERVAL",
            "ping_interval_secs",
            "valid number of seconds",
            defaults.ping_interval_secs,
        )?;
        let log_format = parse_env(
            "RELAY_LOG_FORMAT",
            "log_format",
            "pretty, plain, or json",
            defaults.log_format,
        )?;

        let config = RelayConfig {
            host,
            port,
            max_message_size,
            ping_interval_secs,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "max_message_size".to_string(),
                reason: "Maximum message size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn config_sources(&self) -> HashMap<String, ConfigSource> {
        ENV_VARS
            .iter()
            .map(|(field, var)| {
                let source = match env::var(var) {
                    Ok(_) => ConfigSource::EnvVar(var.to_string()),
                    Err(_) => ConfigSource::Default(field.to_string()),
                };
                (field.to_string(), source)
            })
            .collect()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Keep-alive ping interval, if enabled
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }
}

fn parse_env<T: std::str::FromStr>(
    key: &str,
    field: &str,
    expected: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw,
            expected: expected.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
