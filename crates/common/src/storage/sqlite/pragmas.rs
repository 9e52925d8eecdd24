//! Per-connection SQLite pragmas
//!
//! Every pooled connection gets the same journal, durability and locking
//! settings before it is handed out.

use rusqlite::Connection;

use super::config::SqlitePoolConfig;
use crate::storage::error::{StorageError, StorageResult};

/// Pages written to the WAL before SQLite checkpoints automatically.
const WAL_AUTOCHECKPOINT_PAGES: i64 = 1000;

/// Configure a freshly opened connection.
///
/// `synchronous=NORMAL` is always set; WAL and foreign keys follow the pool
/// config. The busy timeout lets writers from other pooled connections wait
/// instead of failing with `SQLITE_BUSY`.
pub fn apply_connection_pragmas(
    conn: &Connection,
    config: &SqlitePoolConfig,
) -> StorageResult<()> {
    if config.enable_wal {
        set_pragma(conn, "journal_mode", "WAL")?;
        set_pragma(conn, "wal_autocheckpoint", WAL_AUTOCHECKPOINT_PAGES)?;
    }

    set_pragma(conn, "synchronous", "NORMAL")?;
    set_pragma(conn, "foreign_keys", config.enable_foreign_keys)?;

    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::Query(format!("Failed to set busy timeout: {}", e)))
}

fn set_pragma<V: rusqlite::ToSql>(conn: &Connection, name: &str, value: V) -> StorageResult<()> {
    // journal_mode returns a row, so the update goes through the query form.
    conn.pragma_update_and_check(None, name, value, |_| Ok(()))
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(()),
            other => Err(other),
        })
        .map_err(|e| StorageError::Query(format!("Failed to set pragma {}: {}", name, e)))
}
