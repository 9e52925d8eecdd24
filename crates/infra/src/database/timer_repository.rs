//! SQLite-backed timer store.

use std::sync::Arc;

use async_trait::async_trait;
use brewops_common::storage::SqliteConnection;
use brewops_core::TimerStore;
use brewops_domain::{Result, Timer};
use rusqlite::{Row, ToSql};

use super::manager::{map_sql_error, map_storage_error, with_connection, DbManager};

pub struct SqliteTimerRepository {
    db: Arc<DbManager>,
}

impl SqliteTimerRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn write(conn: &SqliteConnection, sql: &str, timer: &Timer) -> Result<usize> {
        let params: [&dyn ToSql; 10] = [
            &timer.id,
            &timer.batch_id,
            &timer.name,
            &timer.started_at,
            &timer.duration_ms,
            &timer.paused,
            &timer.paused_at,
            &timer.remaining_ms,
            &timer.completed,
            &timer.completed_at,
        ];
        conn.execute(sql, params.as_slice()).map_err(map_sql_error)
    }
}

#[async_trait]
impl TimerStore for SqliteTimerRepository {
    async fn insert(&self, timer: &Timer) -> Result<()> {
        let timer = timer.clone();
        with_connection(&self.db, move |conn| {
            Self::write(conn, TIMER_INSERT_SQL, &timer)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Timer>> {
        let id = id.to_string();
        with_connection(&self.db, move |conn| {
            conn.query_optional(TIMER_GET_SQL, &[&id], map_timer_row).map_err(map_storage_error)
        })
        .await
    }

    async fn save(&self, timer: &Timer) -> Result<()> {
        let timer = timer.clone();
        with_connection(&self.db, move |conn| {
            Self::write(conn, TIMER_UPSERT_SQL, &timer)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        with_connection(&self.db, move |conn| {
            let removed = conn
                .execute_sql("DELETE FROM timers WHERE id = ?1", &[&id])
                .map_err(map_storage_error)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Timer>> {
        let batch_id = batch_id.to_string();
        with_connection(&self.db, move |conn| {
            conn.query_all(TIMER_BY_BATCH_SQL, &[&batch_id], map_timer_row)
                .map_err(map_storage_error)
        })
        .await
    }

    async fn delete_completed_before(&self, cutoff_ms: i64) -> Result<usize> {
        with_connection(&self.db, move |conn| {
            conn.execute_sql(
                "DELETE FROM timers WHERE completed = 1 AND started_at < ?1",
                &[&cutoff_ms],
            )
            .map_err(map_storage_error)
        })
        .await
    }
}

const TIMER_INSERT_SQL: &str = "INSERT INTO timers (
        id, batch_id, name, started_at, duration_ms, paused, paused_at, remaining_ms,
        completed, completed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const TIMER_UPSERT_SQL: &str = "INSERT OR REPLACE INTO timers (
        id, batch_id, name, started_at, duration_ms, paused, paused_at, remaining_ms,
        completed, completed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const TIMER_GET_SQL: &str = "SELECT id, batch_id, name, started_at, duration_ms, paused,
        paused_at, remaining_ms, completed, completed_at
    FROM timers
    WHERE id = ?1";

const TIMER_BY_BATCH_SQL: &str = "SELECT id, batch_id, name, started_at, duration_ms, paused,
        paused_at, remaining_ms, completed, completed_at
    FROM timers
    WHERE batch_id = ?1
    ORDER BY started_at ASC, rowid ASC";

fn map_timer_row(row: &Row<'_>) -> rusqlite::Result<Timer> {
    Ok(Timer {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        name: row.get(2)?,
        started_at: row.get(3)?,
        duration_ms: row.get(4)?,
        paused: row.get(5)?,
        paused_at: row.get(6)?,
        remaining_ms: row.get(7)?,
        completed: row.get(8)?,
        completed_at: row.get(9)?,
    })
}
