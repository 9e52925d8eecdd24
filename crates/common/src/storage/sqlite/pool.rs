//! SQLite connection pool
//!
//! Provides r2d2-based connection pooling for the local database. Every
//! pooled connection gets the configured pragmas applied on creation.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// SQLite connection pool
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
}

impl SqlitePool {
    /// Create a new SQLite connection pool
    ///
    /// # Errors
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The database file can't be opened
    /// - Pool creation fails
    #[instrument(fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        config.validate()?;
        info!("Creating SQLite connection pool");

        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {}", e))
            })?;

        info!("SQLite pool created with {} connections", config.max_size);

        Ok(Self { pool, config })
    }

    /// Maximum number of pooled connections
    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }

    /// Get a connection from the pool
    ///
    /// Blocks up to the configured connection timeout when the pool is
    /// exhausted.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                debug!("Connection acquired in {}ms", start.elapsed().as_millis());
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("timed out") || err_str.contains("timeout") {
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {}", e)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_pool_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = SqlitePool::new(&db_path, SqlitePoolConfig::default()).unwrap();
        assert_eq!(pool.max_size(), 4);

        let conn = pool.get_connection().unwrap();
        conn.execute_sql("CREATE TABLE test (id INTEGER PRIMARY KEY)", &[]).unwrap();
    }

    #[test]
    fn test_concurrent_connections() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = Arc::new(SqlitePool::new(&db_path, SqlitePoolConfig::default()).unwrap());

        {
            let conn = pool.get_connection().unwrap();
            conn.execute_sql("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)", &[])
                .unwrap();
        }

        let mut handles = vec![];
        for i in 0..5 {
            let pool_clone = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                let conn = pool_clone.get_connection().unwrap();
                let value = format!("thread_{}", i);
                conn.execute_sql("INSERT INTO test (value) VALUES (?1)", &[&value]).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let conn = pool.get_connection().unwrap();
        let count: i32 = conn.query_row("SELECT COUNT(*) FROM test", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_zero_sized_pool_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = SqlitePoolConfig { max_size: 0, ..SqlitePoolConfig::default() };
        let result = SqlitePool::new(&db_path, config);
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }
}
