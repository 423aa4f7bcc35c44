//! Configuration module for raw_serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `RAW_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./raw_serial.toml` (current directory)
//! 3. `~/.config/raw_serial/raw_serial.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\raw_serial\raw_serial.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `RAW_SERIAL_<SECTION>_<KEY>`
//!
//! Examples:
//! - `RAW_SERIAL_SERIAL_DEFAULT_PORT=/dev/ttyUSB0`
//! - `RAW_SERIAL_SERIAL_DEFAULT_BAUD=256000`
//! - `RAW_SERIAL_LOGGING_LEVEL=raw_serial=trace`
//!
//! Legacy test variables are also supported: `TEST_PORT`, `TEST_BAUD`,
//! `LOOPBACK_ENABLED`.
//!
//! # Example
//!
//! ```rust,no_run
//! use raw_serial::config::ConfigLoader;
//! use raw_serial::{RawSerial, SerialRxTx};
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! let mut rxtx = RawSerial::from_config(raw_serial::port::NativeOpener, &config.serial)?;
//! rxtx.open()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, TestingConfig};
