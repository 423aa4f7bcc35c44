//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "RAW_SERIAL";

/// Config file name
const CONFIG_FILE_NAME: &str = "raw_serial.toml";

/// Application directory under the platform config dir
const APP_DIR_NAME: &str = "raw_serial";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "RAW_SERIAL_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `RAW_SERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./raw_serial.toml` (current directory)
    /// 3. `~/.config/raw_serial/raw_serial.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\raw_serial\raw_serial.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, and the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides are applied; unparsable ones are ignored.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default config directory for this crate.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_key(section_key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, section_key)
}

/// Parse an environment variable if set.
fn parse_env<T: FromStr>(var: &str, what: &str) -> ConfigResult<Option<T>> {
    match std::env::var(var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {}: {:?}", what, val))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `RAW_SERIAL_<SECTION>_<KEY>`
/// For example:
/// - `RAW_SERIAL_SERIAL_DEFAULT_PORT=/dev/ttyUSB0`
/// - `RAW_SERIAL_SERIAL_DEFAULT_BAUD=256000`
/// - `RAW_SERIAL_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Ok(val) = std::env::var(env_key("SERIAL_DEFAULT_PORT")) {
        config.serial.default_port = Some(val);
    }
    if let Some(baud) = parse_env(&env_key("SERIAL_DEFAULT_BAUD"), "baud rate")? {
        config.serial.default_baud = baud;
    }
    if let Some(flags) = parse_env(&env_key("SERIAL_OPEN_FLAGS"), "flags")? {
        config.serial.open_flags = flags;
    }
    if let Some(timeout) = parse_env(&env_key("SERIAL_DEFAULT_TIMEOUT_MS"), "timeout")? {
        config.serial.default_timeout_ms = timeout;
    }
    if let Some(poll) = parse_env(&env_key("SERIAL_CANCEL_POLL_MS"), "poll interval")? {
        config.serial.cancel_poll_ms = poll;
    }

    // Logging overrides
    if let Ok(val) = std::env::var(env_key("LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(env_key("LOGGING_FORMAT")) {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_parse(
                    env_key("LOGGING_FORMAT"),
                    "Expected json, pretty or compact",
                ))
            }
        };
    }

    // Testing overrides (also support legacy TEST_PORT etc.)
    if let Ok(val) =
        std::env::var(env_key("TESTING_PORT")).or_else(|_| std::env::var("TEST_PORT"))
    {
        config.testing.port = Some(val);
    }
    let baud_var = if std::env::var(env_key("TESTING_BAUD")).is_ok() {
        env_key("TESTING_BAUD")
    } else {
        "TEST_BAUD".to_string()
    };
    if let Some(baud) = parse_env(&baud_var, "baud rate")? {
        config.testing.baud = baud;
    }
    if let Some(timeout) = parse_env(&env_key("TESTING_TIMEOUT_MS"), "timeout")? {
        config.testing.timeout_ms = timeout;
    }
    if let Ok(val) = std::env::var("LOOPBACK_ENABLED") {
        config.testing.loopback_enabled = val.to_lowercase() == "true" || val == "1";
    }

    Ok(())
}
