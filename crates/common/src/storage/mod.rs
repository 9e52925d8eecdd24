//! Storage primitives for the local database
//!
//! This module provides the SQLite connection pool shared by every local
//! collection (outbox, timers, cache, session state) together with the
//! storage error type.

pub mod error;
pub mod sqlite;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use sqlite::{apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig};
