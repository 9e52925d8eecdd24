//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::path::PathBuf;

use brewops_domain::BrewOpsError;
use brewops_infra::config;
use brewops_infra::sync::{CleanupServiceConfig, SyncManagerConfig};
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create config file");
    file.write_all(contents.as_bytes()).expect("Failed to write config file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "brewops.json",
        r#"{
            "database": { "path": "/tmp/brewops_integration.db", "pool_size": 6 },
            "outbox": {
                "base_delay_ms": 500,
                "cap_delay_ms": 30000,
                "max_retry_count": 3,
                "drain_interval_ms": 15000,
                "retention_days": 14,
                "batch_size": 20
            },
            "network": { "probe_addr": "api.brewops.test:443", "probe_interval_ms": 5000 },
            "cleanup": { "interval_secs": 600 }
        }"#,
    );

    let config = config::load_from_file(Some(path)).expect("JSON config should load");

    assert_eq!(config.database.path, "/tmp/brewops_integration.db");
    assert_eq!(config.database.pool_size, 6);
    assert_eq!(config.outbox.max_retry_count, 3);
    assert_eq!(config.outbox.retention_days, 14);
    assert_eq!(config.network.probe_addr.as_deref(), Some("api.brewops.test:443"));
    assert_eq!(config.network.probe_timeout_ms, 3_000);
    assert!(config.validate().is_ok());

    let manager = SyncManagerConfig::from(&config.outbox);
    assert_eq!(manager.batch_size, 20);
    assert_eq!(manager.drain_interval, Duration::from_secs(15));
    assert_eq!(manager.retry_policy.max_retry_count(), 3);
    assert_eq!(manager.retry_policy.backoff_delay(1), Duration::from_millis(500));

    let cleanup = CleanupServiceConfig::from(&config);
    assert_eq!(cleanup.retention, Duration::from_secs(14 * 86_400));
    assert_eq!(cleanup.cleanup_interval, Duration::from_secs(600));
}

#[test]
fn test_load_config_from_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "brewops.toml",
        r#"
[database]
path = "/tmp/brewops_integration_toml.db"

[outbox]
cap_delay_ms = 120000
batch_size = 5
"#,
    );

    let config = config::load_from_file(Some(path)).expect("TOML config should load");

    assert_eq!(config.database.path, "/tmp/brewops_integration_toml.db");
    assert_eq!(config.database.pool_size, 4);
    assert_eq!(config.outbox.cap_delay_ms, 120_000);
    assert_eq!(config.outbox.batch_size, 5);
    assert_eq!(config.outbox.base_delay_ms, 1_000);
    assert!(config.network.probe_addr.is_none());
    assert_eq!(config.cleanup.interval_secs, 3_600);
}

#[test]
fn test_empty_toml_file_yields_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "config.toml", "");

    let config = config::load_from_file(Some(path)).expect("empty TOML should load");

    assert_eq!(config, brewops_domain::Config::default());
}

#[test]
fn test_invalid_json_is_config_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "brewops.json", r#"{ "database": { "path": 42 } }"#);

    let err = config::load_from_file(Some(path)).expect_err("invalid JSON should fail");
    assert!(matches!(err, BrewOpsError::Config(msg) if msg.contains("Invalid JSON")));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "brewops.yaml", "database:\n  path: x.db\n");

    let err = config::load_from_file(Some(path)).expect_err("YAML is not supported");
    assert!(matches!(err, BrewOpsError::Config(msg) if msg.contains("Unsupported")));
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("does-not-exist.toml");

    let err = config::load_from_file(Some(path)).expect_err("missing file should fail");
    assert!(matches!(err, BrewOpsError::Config(msg) if msg.contains("not found")));
}

#[test]
fn test_loaded_values_still_validate() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "brewops.toml",
        r#"
[outbox]
base_delay_ms = 90000
cap_delay_ms = 60000
"#,
    );

    let config = config::load_from_file(Some(path)).expect("file parses");
    let err = config.validate().expect_err("inverted delays are invalid");
    assert!(matches!(err, BrewOpsError::Config(msg) if msg.contains("cap_delay_ms")));
}
