//! SQLite connection pool configuration

use std::time::Duration;

/// SQLite pool configuration
#[derive(Debug, Clone)]
pub struct SqlitePoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Busy timeout for SQLite operations
    pub busy_timeout: Duration,

    /// Enable WAL journal mode
    pub enable_wal: bool,

    /// Enable foreign key constraints
    pub enable_foreign_keys: bool,
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqlitePoolConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error if the pool size is zero.
    pub fn validate(&self) -> crate::storage::StorageResult<()> {
        if self.max_size == 0 {
            return Err(crate::storage::StorageError::InvalidConfig(
                "max_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
