//! SQLite-backed implementation of the outbox store port.
//!
//! Every call runs on the blocking pool with its own pooled connection, so
//! producers can enqueue while a drain is reading or updating other rows.

use std::sync::Arc;

use async_trait::async_trait;
use brewops_common::storage::SqliteConnection;
use brewops_core::{Clock, OutboxStore};
use brewops_domain::{
    BrewOpsError, OperationScope, OutboxItem, OutboxItemUpdate, OutboxStatus, Result,
};
use rusqlite::{Row, ToSql};
use tracing::warn;

use super::manager::{map_sql_error, map_storage_error, with_connection, DbManager};

pub struct SqliteOutboxRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteOutboxRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn insert_item(conn: &SqliteConnection, item: &OutboxItem) -> Result<()> {
        let payload_json = serde_json::to_string(&item.payload)?;
        let status = item.status.to_string();
        let params: [&dyn ToSql; 11] = [
            &item.id,
            &item.operation_type,
            &payload_json,
            &item.scope.workspace_id,
            &item.scope.user_id,
            &item.created_at,
            &item.idempotency_key,
            &item.retry_count,
            &item.last_attempt_at,
            &item.error,
            &status,
        ];

        conn.execute(OUTBOX_INSERT_SQL, params.as_slice()).map_err(map_sql_error)?;
        Ok(())
    }

    fn apply_update(
        conn: &SqliteConnection,
        id: &str,
        update: &OutboxItemUpdate,
        now_ms: i64,
    ) -> Result<usize> {
        let status = update.status.map(|status| status.to_string());
        let stamp = update.touches_attempt().then_some(now_ms);
        let params: [&dyn ToSql; 5] = [&update.retry_count, &update.error, &status, &stamp, &id];

        conn.execute(OUTBOX_UPDATE_SQL, params.as_slice()).map_err(map_sql_error)
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxRepository {
    async fn enqueue(&self, item: &OutboxItem) -> Result<String> {
        let to_insert = item.clone();
        with_connection(&self.db, move |conn| {
            Self::insert_item(conn, &to_insert)?;
            Ok(to_insert.id)
        })
        .await
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = usize_to_i64(limit);
        with_connection(&self.db, move |conn| query_items(conn, OUTBOX_PENDING_SQL, &[&limit]))
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxItem>> {
        let id = id.to_string();
        with_connection(&self.db, move |conn| {
            conn.query_optional(OUTBOX_GET_SQL, &[&id], map_outbox_row).map_err(map_storage_error)
        })
        .await
    }

    async fn update(&self, id: &str, update: &OutboxItemUpdate) -> Result<()> {
        let id = id.to_string();
        let update = update.clone();
        let now_ms = self.clock.now_ms();
        with_connection(&self.db, move |conn| {
            if update.is_empty() {
                let exists: Option<i64> = conn
                    .query_optional(OUTBOX_EXISTS_SQL, &[&id], |row| row.get(0))
                    .map_err(map_storage_error)?;
                return exists
                    .map(|_| ())
                    .ok_or_else(|| BrewOpsError::NotFound(format!("outbox item {id}")));
            }
            match Self::apply_update(conn, &id, &update, now_ms)? {
                0 => Err(BrewOpsError::NotFound(format!("outbox item {id}"))),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        with_connection(&self.db, move |conn| {
            let removed = conn
                .execute("DELETE FROM outbox_items WHERE id = ?1", [&id])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        with_connection(&self.db, |conn| count_rows(conn, "SELECT COUNT(*) FROM outbox_items"))
            .await
    }

    async fn count_pending(&self) -> Result<usize> {
        with_connection(&self.db, |conn| {
            count_rows(conn, "SELECT COUNT(*) FROM outbox_items WHERE status = 'pending'")
        })
        .await
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<OutboxItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = usize_to_i64(limit);
        with_connection(&self.db, move |conn| query_items(conn, OUTBOX_FAILED_SQL, &[&limit]))
            .await
    }

    async fn list_by_scope(&self, scope: &OperationScope) -> Result<Vec<OutboxItem>> {
        let scope = scope.clone();
        with_connection(&self.db, move |conn| {
            query_items(conn, OUTBOX_BY_SCOPE_SQL, &[&scope.workspace_id, &scope.user_id])
        })
        .await
    }

    async fn clear(&self) -> Result<usize> {
        with_connection(&self.db, |conn| {
            conn.execute_sql("DELETE FROM outbox_items", &[]).map_err(map_storage_error)
        })
        .await
    }

    async fn delete_created_before(&self, cutoff_ms: i64) -> Result<usize> {
        with_connection(&self.db, move |conn| {
            conn.execute_sql("DELETE FROM outbox_items WHERE created_at < ?1", &[&cutoff_ms])
                .map_err(map_storage_error)
        })
        .await
    }
}

const OUTBOX_INSERT_SQL: &str = "INSERT INTO outbox_items (
        id, operation_type, payload_json, workspace_id, user_id, created_at,
        idempotency_key, retry_count, last_attempt_at, error, status
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

// retry_count only moves up, whatever the caller passes.
const OUTBOX_UPDATE_SQL: &str = "UPDATE outbox_items SET
        retry_count = CASE WHEN ?1 IS NULL THEN retry_count ELSE MAX(retry_count, ?1) END,
        error = COALESCE(?2, error),
        status = COALESCE(?3, status),
        last_attempt_at = COALESCE(?4, last_attempt_at)
    WHERE id = ?5";

const OUTBOX_PENDING_SQL: &str = "SELECT id, operation_type, payload_json, workspace_id, user_id,
        created_at, idempotency_key, retry_count, last_attempt_at, error, status
    FROM outbox_items
    WHERE status = 'pending'
    ORDER BY created_at ASC, rowid ASC
    LIMIT ?1";

const OUTBOX_FAILED_SQL: &str = "SELECT id, operation_type, payload_json, workspace_id, user_id,
        created_at, idempotency_key, retry_count, last_attempt_at, error, status
    FROM outbox_items
    WHERE status = 'failed'
    ORDER BY created_at ASC, rowid ASC
    LIMIT ?1";

const OUTBOX_BY_SCOPE_SQL: &str = "SELECT id, operation_type, payload_json, workspace_id, user_id,
        created_at, idempotency_key, retry_count, last_attempt_at, error, status
    FROM outbox_items
    WHERE workspace_id = ?1 AND user_id = ?2
    ORDER BY created_at ASC, rowid ASC";

const OUTBOX_GET_SQL: &str = "SELECT id, operation_type, payload_json, workspace_id, user_id,
        created_at, idempotency_key, retry_count, last_attempt_at, error, status
    FROM outbox_items
    WHERE id = ?1";

const OUTBOX_EXISTS_SQL: &str = "SELECT 1 FROM outbox_items WHERE id = ?1";

fn query_items(
    conn: &SqliteConnection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<OutboxItem>> {
    conn.query_all(sql, params, map_outbox_row).map_err(map_storage_error)
}

fn count_rows(conn: &SqliteConnection, sql: &str) -> Result<usize> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0)).map_err(map_sql_error)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn map_outbox_row(row: &Row<'_>) -> rusqlite::Result<OutboxItem> {
    let id: String = row.get(0)?;
    let payload_raw: String = row.get(2)?;
    let payload = serde_json::from_str(&payload_raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;
    let status_raw: String = row.get(10)?;
    let status = parse_status(&id, &status_raw);

    Ok(OutboxItem {
        id,
        operation_type: row.get(1)?,
        payload,
        scope: OperationScope { workspace_id: row.get(3)?, user_id: row.get(4)? },
        created_at: row.get(5)?,
        idempotency_key: row.get(6)?,
        retry_count: row.get(7)?,
        last_attempt_at: row.get(8)?,
        error: row.get(9)?,
        status,
    })
}

fn parse_status(id: &str, raw: &str) -> OutboxStatus {
    match raw.parse::<OutboxStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                item_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid outbox status in database - treating as failed"
            );
            OutboxStatus::Failed
        }
    }
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
