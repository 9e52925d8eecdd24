//! SQLite-backed expiring cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brewops_core::{CacheStore, Clock};
use brewops_domain::{CacheEntry, Result};
use rusqlite::Row;
use tracing::debug;

use super::manager::{map_sql_error, map_storage_error, with_connection, DbManager};

pub struct SqliteCacheRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteCacheRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheRepository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let key = key.to_string();
        let now = self.clock.now_ms();
        with_connection(&self.db, move |conn| {
            let entry = conn
                .query_optional(CACHE_GET_SQL, &[&key], map_cache_row)
                .map_err(map_storage_error)?;
            match entry {
                Some(entry) if entry.is_expired_at(now) => {
                    // Only delete the row we saw; a concurrent set may have refreshed it.
                    conn.execute(
                        "DELETE FROM cache_entries WHERE key = ?1 AND expires_at <= ?2",
                        rusqlite::params![key, now],
                    )
                    .map_err(map_sql_error)?;
                    debug!(cache_key = %key, "Evicted expired cache entry on read");
                    Ok(None)
                }
                other => Ok(other),
            }
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.to_string();
        let value_json = serde_json::to_string(value)?;
        let now = self.clock.now_ms();
        let expires_at = ttl.map(|ttl| {
            now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        });
        with_connection(&self.db, move |conn| {
            conn.execute(CACHE_UPSERT_SQL, rusqlite::params![key, value_json, expires_at, now])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        with_connection(&self.db, move |conn| {
            let removed = conn
                .execute("DELETE FROM cache_entries WHERE key = ?1", [&key])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        with_connection(&self.db, move |conn| {
            conn.execute_sql(
                "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                &[&now],
            )
            .map_err(map_storage_error)
        })
        .await
    }

    async fn clear(&self) -> Result<usize> {
        with_connection(&self.db, |conn| {
            conn.execute_sql("DELETE FROM cache_entries", &[]).map_err(map_storage_error)
        })
        .await
    }
}

const CACHE_GET_SQL: &str = "SELECT key, value_json, expires_at, updated_at
    FROM cache_entries
    WHERE key = ?1";

const CACHE_UPSERT_SQL: &str = "INSERT INTO cache_entries (key, value_json, expires_at, updated_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(key) DO UPDATE SET
        value_json = excluded.value_json,
        expires_at = excluded.expires_at,
        updated_at = excluded.updated_at";

fn map_cache_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let raw: String = row.get(1)?;
    let value = serde_json::from_str(&raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(CacheEntry { key: row.get(0)?, value, expires_at: row.get(2)?, updated_at: row.get(3)? })
}

#[cfg(test)]
mod tests {
    use brewops_core::MockClock;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, SqliteCacheRepository, MockClock) {
        let temp_dir = TempDir::new().unwrap();
        let db = DbManager::new(temp_dir.path().join("cache.db"), 2).unwrap();
        db.run_migrations().unwrap();
        let clock = MockClock::new(10_000);
        let repo = SqliteCacheRepository::new(Arc::new(db), Arc::new(clock.clone()));
        (temp_dir, repo, clock)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expired_read_returns_none_and_deletes() {
        let (_dir, repo, clock) = setup();
        repo.set("styles", &json!(["ipa", "stout"]), Some(Duration::from_secs(60))).await.unwrap();

        let hit = repo.get("styles").await.unwrap().unwrap();
        assert_eq!(hit.value, json!(["ipa", "stout"]));
        assert_eq!(hit.expires_at, Some(70_000));

        clock.advance(Duration::from_secs(60));
        assert!(repo.get("styles").await.unwrap().is_none());
        assert!(!repo.remove("styles").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_overwrites_and_entries_without_ttl_never_expire() {
        let (_dir, repo, clock) = setup();
        repo.set("yeast", &json!({"strain": "US-05"}), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        repo.set("yeast", &json!({"strain": "WLP001"}), None).await.unwrap();

        clock.advance(Duration::from_secs(86_400));
        let entry = repo.get("yeast").await.unwrap().unwrap();
        assert_eq!(entry.value["strain"], "WLP001");
        assert!(entry.expires_at.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sweep_removes_only_expired() {
        let (_dir, repo, clock) = setup();
        repo.set("a", &json!(1), Some(Duration::from_secs(1))).await.unwrap();
        repo.set("b", &json!(2), Some(Duration::from_secs(100))).await.unwrap();
        repo.set("c", &json!(3), None).await.unwrap();

        clock.advance(Duration::from_secs(10));
        assert_eq!(repo.sweep_expired().await.unwrap(), 1);
        assert!(repo.get("b").await.unwrap().is_some());
        assert_eq!(repo.clear().await.unwrap(), 2);
    }
}
