//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument or environment variable (both parsed by clap in `main`)
//! 2. TOML config file
//! 3. Built-in defaults
//!
//! The Rebrickable API key has no default and must come from one of the first two tiers.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP port (the web frontend expects http://localhost:8080)
pub const DEFAULT_PORT: u16 = 8080;

/// Default Rebrickable API base URL
pub const DEFAULT_REBRICKABLE_BASE_URL: &str = "https://rebrickable.com/api/v3";

/// Default timeout for outbound catalog requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration file contents
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub rebrickable_api_key: Option<String>,

    #[serde(default)]
    pub rebrickable_base_url: Option<String>,

    /// Outbound catalog request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub port: Option<u16>,
    pub rebrickable_api_key: Option<String>,
    pub rebrickable_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub port: u16,
    pub rebrickable_api_key: String,
    pub rebrickable_base_url: String,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides over the TOML file over built-in defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let rebrickable_api_key = overrides
            .rebrickable_api_key
            .or(file.rebrickable_api_key)
            .filter(|key| is_valid_key(key))
            .ok_or_else(|| {
                Error::Config(
                    "Rebrickable API key not configured. Set REBRICKABLE_API_KEY, pass \
                     --rebrickable-api-key, or add rebrickable_api_key to the config file"
                        .to_string(),
                )
            })?;

        let rebrickable_base_url = overrides
            .rebrickable_base_url
            .or(file.rebrickable_base_url)
            .unwrap_or_else(|| DEFAULT_REBRICKABLE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = overrides
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_path: overrides
                .database
                .or(file.database)
                .map(|db| strip_sqlite_scheme(&db))
                .unwrap_or_else(default_database_path),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            rebrickable_api_key,
            rebrickable_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level: overrides
                .log_level
                .or(file.logging.level)
                .unwrap_or_else(|| "info".to_string()),
        })
    }

    /// API key prefix safe to print in logs
    pub fn redacted_api_key(&self) -> String {
        let prefix: String = self.rebrickable_api_key.chars().take(10).collect();
        format!("{}...", prefix)
    }
}

/// Accept `sqlite://path` and `sqlite:path` as well as a bare path
fn strip_sqlite_scheme(value: &Path) -> PathBuf {
    let raw = value.to_string_lossy();
    let stripped = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(&raw);
    PathBuf::from(stripped)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Load the TOML config file
///
/// An explicit path must exist. Without one, the platform config file is used
/// when present and an empty config is returned otherwise.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_file() {
            Some(path) if path.exists() => path,
            _ => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// `<config_dir>/missingbrick/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("missingbrick").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("missingbrick").join("missingbrick.db"))
        .unwrap_or_else(|| PathBuf::from("./missingbrick.db"))
}
