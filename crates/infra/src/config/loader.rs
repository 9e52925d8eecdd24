//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `BREWOPS_DB_PATH` is not set, falls back to loading from file; once
//!    it is set, a malformed optional variable is an error rather than a
//!    reason to fall back
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `BREWOPS_DB_PATH`: Database file path (required)
//! - `BREWOPS_DB_POOL_SIZE`: Connection pool size
//! - `BREWOPS_BASE_DELAY_MS`: First retry backoff window
//! - `BREWOPS_CAP_DELAY_MS`: Upper bound for any backoff window
//! - `BREWOPS_MAX_RETRY_COUNT`: Retry count at which an item becomes terminal
//! - `BREWOPS_DRAIN_INTERVAL_MS`: Period of the background drain
//! - `BREWOPS_RETENTION_DAYS`: Garbage collection horizon
//! - `BREWOPS_BATCH_SIZE`: Items visited per drain pass
//! - `BREWOPS_PROBE_ADDR`: `host:port` probed for connectivity
//!
//! Optional variables fall back to the defaults of the matching section.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./brewops.{json,toml}` and `./config.{json,toml}` (current directory)
//! 2. The same names one and two directories up
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use brewops_domain::{BrewOpsError, Config, DatabaseConfig, NetworkConfig, OutboxConfig, Result};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["brewops.json", "brewops.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `BrewOpsError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    let config = if env_opt("BREWOPS_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    } else {
        tracing::debug!("BREWOPS_DB_PATH not set, trying config file");
        load_from_file(None)?
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `BrewOpsError::Config` if `BREWOPS_DB_PATH` is missing or any
/// variable that is set cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let path = env_var("BREWOPS_DB_PATH")?;

    let database_defaults = DatabaseConfig::default();
    let outbox_defaults = OutboxConfig::default();
    let network_defaults = NetworkConfig::default();

    Ok(Config {
        database: DatabaseConfig {
            path,
            pool_size: env_parse("BREWOPS_DB_POOL_SIZE", database_defaults.pool_size)?,
        },
        outbox: OutboxConfig {
            base_delay_ms: env_parse("BREWOPS_BASE_DELAY_MS", outbox_defaults.base_delay_ms)?,
            cap_delay_ms: env_parse("BREWOPS_CAP_DELAY_MS", outbox_defaults.cap_delay_ms)?,
            max_retry_count: env_parse(
                "BREWOPS_MAX_RETRY_COUNT",
                outbox_defaults.max_retry_count,
            )?,
            drain_interval_ms: env_parse(
                "BREWOPS_DRAIN_INTERVAL_MS",
                outbox_defaults.drain_interval_ms,
            )?,
            retention_days: env_parse("BREWOPS_RETENTION_DAYS", outbox_defaults.retention_days)?,
            batch_size: env_parse("BREWOPS_BATCH_SIZE", outbox_defaults.batch_size)?,
        },
        network: NetworkConfig {
            probe_addr: env_opt("BREWOPS_PROBE_ADDR").or(network_defaults.probe_addr),
            ..network_defaults
        },
        cleanup: Default::default(),
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BrewOpsError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BrewOpsError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BrewOpsError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BrewOpsError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format follows the extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BrewOpsError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BrewOpsError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BrewOpsError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file among the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        BrewOpsError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; empty values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable, using `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| BrewOpsError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}
