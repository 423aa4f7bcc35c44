//! Logging setup.
//!
//! The library only emits `tracing` events. Applications (and tests that
//! want output) install a subscriber once through [`init_logging`].

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("Invalid log filter '{directive}': {message}")]
    Filter { directive: String, message: String },

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Build the event filter: `RUST_LOG` when set, otherwise `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(level).map_err(|e| LoggingError::Filter {
            directive: level.to_string(),
            message: e.to_string(),
        })
    })
}

/// Install a global `tracing` subscriber writing to stderr.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level)?)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}
