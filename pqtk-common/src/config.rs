//! Configuration loading and client settings resolution
//!
//! Settings follow the same priority order for every field:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unparsable TOML file never aborts startup: the loader logs a
//! warning and falls back to defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the config file location
pub const ENV_CONFIG_FILE: &str = "PQTK_CONFIG";
/// Environment variable overriding the backend base URL
pub const ENV_API_URL: &str = "PQTK_API_URL";
/// Environment variable overriding the bearer token file
pub const ENV_TOKEN_FILE: &str = "PQTK_TOKEN_FILE";
/// Environment variable consulted for the log filter
pub const ENV_LOG: &str = "RUST_LOG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Backend base URL, e.g. `https://pqtk.example.org`
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Where the bearer token is persisted between invocations
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub api_base_url: String,
    pub token_file: PathBuf,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let token_file = dirs::data_local_dir()
            .map(|d| d.join("pqtk").join("token"))
            .unwrap_or_else(|| PathBuf::from("./pqtk_data/token"));

        Self {
            api_base_url: "http://localhost:8787".to_string(),
            token_file,
            request_timeout: Duration::from_secs(30),
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved settings handed to the transport layer
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub token_file: PathBuf,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl ClientSettings {
    /// Resolve every field through CLI > ENV > TOML > default
    pub fn resolve(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let api_base_url = overrides
            .api_base_url
            .clone()
            .or_else(|| non_empty_env(ENV_API_URL))
            .or_else(|| toml_config.api_base_url.clone())
            .unwrap_or(defaults.api_base_url);
        let api_base_url = normalize_base_url(&api_base_url)?;

        let token_file = overrides
            .token_file
            .clone()
            .or_else(|| non_empty_env(ENV_TOKEN_FILE).map(PathBuf::from))
            .or_else(|| toml_config.token_file.clone())
            .unwrap_or(defaults.token_file);

        let request_timeout = toml_config
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let log_level = overrides
            .log_level
            .clone()
            .or_else(|| non_empty_env(ENV_LOG))
            .unwrap_or_else(|| toml_config.logging.level.clone());

        Ok(Self {
            api_base_url,
            token_file,
            request_timeout,
            log_level,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Trim a trailing slash and require an http(s) scheme
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API base URL must start with http:// or https://, got {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

/// Location of the TOML config file
///
/// `PQTK_CONFIG` wins; otherwise `<config_dir>/pqtk/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_env(ENV_CONFIG_FILE) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("pqtk").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the TOML config, degrading to defaults when it is missing or broken
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        debug!("No config file location available, using defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8787/").unwrap(),
            "http://localhost:8787"
        );
        assert_eq!(
            normalize_base_url("  https://pqtk.example.org ").unwrap(),
            "https://pqtk.example.org"
        );
        assert!(normalize_base_url("localhost:8787").is_err());
        assert!(normalize_base_url("").is_err());
    }

    #[test]
    fn test_logging_default_level() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.api_base_url.is_none());
    }
}
