//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial transport configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Hardware testing configuration
    pub testing: TestingConfig,
}

impl Config {
    /// Check values that would make the transport misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.default_baud == 0 {
            return Err(ConfigError::validation(
                "serial.default_baud",
                "baud rate must be positive",
            ));
        }
        if self.serial.cancel_poll_ms == 0 {
            return Err(ConfigError::validation(
                "serial.cancel_poll_ms",
                "cancel poll interval must be positive",
            ));
        }
        if self.testing.baud == 0 {
            return Err(ConfigError::validation(
                "testing.baud",
                "baud rate must be positive",
            ));
        }
        Ok(())
    }
}

/// Serial transport configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port bound at construction, if any
    pub default_port: Option<String>,
    /// Default baud rate for new connections
    pub default_baud: u32,
    /// Opaque open flags handed to the binding
    pub open_flags: u32,
    /// Default wait-for-data timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Longest single readiness wait, i.e. cancellation latency
    pub cancel_poll_ms: u64,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_port: None,
            default_baud: 115200,
            open_flags: 0,
            default_timeout_ms: 1000,
            cancel_poll_ms: 20,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Get the default timeout as Duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Get the cancellation poll interval as Duration
    pub fn cancel_poll(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Hardware testing configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    /// Test port name
    pub port: Option<String>,
    /// Test baud rate
    pub baud: u32,
    /// Whether TX is wired back to RX on the test port
    pub loopback_enabled: bool,
    /// Test timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115200,
            loopback_enabled: false,
            timeout_ms: 2000,
        }
    }
}

impl TestingConfig {
    /// Get the test timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or "raw_serial=trace"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
