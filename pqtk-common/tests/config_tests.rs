//! Configuration resolution and graceful degradation
//!
//! Uses serial_test: tests that touch PQTK_* or RUST_LOG are marked #[serial]
//! so they never race on the process environment.

use pqtk_common::config::{
    config_file_path, load_toml_config, load_toml_config_or_default, write_toml_config,
    ClientSettings, CompiledDefaults, ConfigOverrides, LoggingConfig, TomlConfig, ENV_API_URL,
    ENV_CONFIG_FILE, ENV_LOG, ENV_TOKEN_FILE,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_API_URL);
    env::remove_var(ENV_TOKEN_FILE);
    env::remove_var(ENV_CONFIG_FILE);
    env::remove_var(ENV_LOG);
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(defaults.api_base_url, "http://localhost:8787");
    assert_eq!(defaults.request_timeout, Duration::from_secs(30));
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.token_file.file_name().unwrap(), "token");
}

#[test]
#[serial]
fn test_resolve_uses_defaults_without_sources() {
    clear_env();
    let settings = ClientSettings::resolve(&ConfigOverrides::default(), &TomlConfig::default()).unwrap();
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(settings.api_base_url, defaults.api_base_url);
    assert_eq!(settings.token_file, defaults.token_file);
    assert_eq!(settings.request_timeout, Duration::from_secs(30));
    assert_eq!(settings.log_level, "info");
}

#[test]
#[serial]
fn test_resolve_priority_cli_env_toml() {
    clear_env();
    let toml_config = TomlConfig {
        api_base_url: Some("http://toml.example:1".to_string()),
        token_file: Some(PathBuf::from("/tmp/toml-token")),
        request_timeout_secs: Some(5),
        logging: LoggingConfig {
            level: "warn".to_string(),
        },
    };

    let settings = ClientSettings::resolve(&ConfigOverrides::default(), &toml_config).unwrap();
    assert_eq!(settings.api_base_url, "http://toml.example:1");
    assert_eq!(settings.token_file, PathBuf::from("/tmp/toml-token"));
    assert_eq!(settings.request_timeout, Duration::from_secs(5));
    assert_eq!(settings.log_level, "warn");

    env::set_var(ENV_API_URL, "http://env.example:2/");
    env::set_var(ENV_TOKEN_FILE, "/tmp/env-token");
    env::set_var(ENV_LOG, "debug");
    let settings = ClientSettings::resolve(&ConfigOverrides::default(), &toml_config).unwrap();
    assert_eq!(settings.api_base_url, "http://env.example:2");
    assert_eq!(settings.token_file, PathBuf::from("/tmp/env-token"));
    assert_eq!(settings.log_level, "debug");

    let overrides = ConfigOverrides {
        api_base_url: Some("https://cli.example".to_string()),
        token_file: Some(PathBuf::from("/tmp/cli-token")),
        log_level: Some("trace".to_string()),
    };
    let settings = ClientSettings::resolve(&overrides, &toml_config).unwrap();
    assert_eq!(settings.api_base_url, "https://cli.example");
    assert_eq!(settings.token_file, PathBuf::from("/tmp/cli-token"));
    assert_eq!(settings.log_level, "trace");

    clear_env();
}

#[test]
#[serial]
fn test_resolve_rejects_bad_url() {
    clear_env();
    let overrides = ConfigOverrides {
        api_base_url: Some("ftp://nope".to_string()),
        ..Default::default()
    };
    assert!(ClientSettings::resolve(&overrides, &TomlConfig::default()).is_err());
}

#[test]
#[serial]
fn test_zero_timeout_falls_back_to_default() {
    clear_env();
    let toml_config = TomlConfig {
        request_timeout_secs: Some(0),
        ..Default::default()
    };
    let settings = ClientSettings::resolve(&ConfigOverrides::default(), &toml_config).unwrap();
    assert_eq!(settings.request_timeout, Duration::from_secs(30));
}

#[test]
#[serial]
fn test_config_file_path_env_override() {
    clear_env();
    env::set_var(ENV_CONFIG_FILE, "/tmp/pqtk-test/config.toml");
    assert_eq!(config_file_path(), Some(PathBuf::from("/tmp/pqtk-test/config.toml")));
    clear_env();
}

#[test]
fn test_toml_write_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = TomlConfig {
        api_base_url: Some("http://localhost:9000".to_string()),
        token_file: None,
        request_timeout_secs: Some(12),
        logging: LoggingConfig::default(),
    };

    write_toml_config(&config, &path).unwrap();
    assert_eq!(load_toml_config(&path).unwrap(), config);
}

#[test]
fn test_missing_config_degrades_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    assert_eq!(load_toml_config_or_default(Some(&path)), TomlConfig::default());
    assert_eq!(load_toml_config_or_default(None), TomlConfig::default());
}

#[test]
fn test_broken_config_degrades_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "api_base_url = [not toml").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert_eq!(load_toml_config_or_default(Some(&path)), TomlConfig::default());
}
