//! Configuration structures
//!
//! Every section has serde defaults so a partial file (or an empty one) yields
//! a usable configuration. Loading from the environment or disk lives in the
//! infrastructure crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{BrewOpsError, Result};

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub outbox: OutboxConfig,
    pub network: NetworkConfig,
    pub cleanup: CleanupConfig,
}

impl Config {
    /// Reject configurations the outbox cannot run with.
    ///
    /// # Errors
    /// Returns `BrewOpsError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.outbox.validate()?;
        self.network.validate()?;
        self.cleanup.validate()
    }
}

/// Local database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "brewops.db".to_string(), pool_size: 4 }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(BrewOpsError::Config("database.path must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(BrewOpsError::Config("database.pool_size must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Outbox retry and drain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// First backoff window after a failed attempt
    pub base_delay_ms: u64,
    /// Upper bound for any backoff window
    pub cap_delay_ms: u64,
    /// Retry count at which an item becomes terminal
    pub max_retry_count: u32,
    /// Period of the background drain
    pub drain_interval_ms: u64,
    /// Age after which items and completed timers are garbage collected
    pub retention_days: u32,
    /// Maximum items visited per drain pass
    pub batch_size: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            cap_delay_ms: 60_000,
            max_retry_count: 5,
            drain_interval_ms: 30_000,
            retention_days: 7,
            batch_size: 10,
        }
    }
}

impl OutboxConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn cap_delay(&self) -> Duration {
        Duration::from_millis(self.cap_delay_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 86_400)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(BrewOpsError::Config("outbox.batch_size must be greater than 0".into()));
        }
        if self.base_delay_ms == 0 {
            return Err(BrewOpsError::Config("outbox.base_delay_ms must be greater than 0".into()));
        }
        if self.base_delay_ms > self.cap_delay_ms {
            return Err(BrewOpsError::Config(format!(
                "outbox.base_delay_ms ({}) cannot exceed outbox.cap_delay_ms ({})",
                self.base_delay_ms, self.cap_delay_ms
            )));
        }
        if self.drain_interval_ms == 0 {
            return Err(BrewOpsError::Config(
                "outbox.drain_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Connectivity probing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// `host:port` probed to decide whether the remote system is reachable.
    /// When unset, connectivity is driven by the host application.
    pub probe_addr: Option<String>,
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { probe_addr: None, probe_interval_ms: 10_000, probe_timeout_ms: 3_000 }
    }
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.probe_addr.is_some() && self.probe_interval_ms == 0 {
            return Err(BrewOpsError::Config(
                "network.probe_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Background garbage collection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_secs: 3_600 }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(BrewOpsError::Config("cleanup.interval_secs must be greater than 0".into()));
        }
        Ok(())
    }
}
