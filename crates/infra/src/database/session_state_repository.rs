//! SQLite-backed per-batch session state.
//!
//! The record is stored as one JSON document; `put` replaces it wholesale.

use std::sync::Arc;

use async_trait::async_trait;
use brewops_core::{Clock, SessionStateStore};
use brewops_domain::{BrewOpsError, Result, SessionState};

use super::manager::{map_sql_error, map_storage_error, with_connection, DbManager};

pub struct SqliteSessionStateRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionStateRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl SessionStateStore for SqliteSessionStateRepository {
    async fn get(&self, batch_id: &str) -> Result<Option<SessionState>> {
        let batch_id = batch_id.to_string();
        let raw: Option<String> = with_connection(&self.db, move |conn| {
            conn.query_optional(
                "SELECT state_json FROM session_state WHERE batch_id = ?1",
                &[&batch_id],
                |row| row.get(0),
            )
            .map_err(map_storage_error)
        })
        .await?;

        raw.map(|json| serde_json::from_str(&json).map_err(BrewOpsError::from)).transpose()
    }

    async fn put(&self, state: &SessionState) -> Result<SessionState> {
        let mut stored = state.clone();
        stored.updated_at = self.clock.now_ms();
        let state_json = serde_json::to_string(&stored)?;
        let batch_id = stored.batch_id.clone();
        let updated_at = stored.updated_at;

        with_connection(&self.db, move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_state (batch_id, state_json, updated_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![batch_id, state_json, updated_at],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    async fn remove(&self, batch_id: &str) -> Result<bool> {
        let batch_id = batch_id.to_string();
        with_connection(&self.db, move |conn| {
            let removed = conn
                .execute("DELETE FROM session_state WHERE batch_id = ?1", [&batch_id])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_batch_ids(&self) -> Result<Vec<String>> {
        with_connection(&self.db, |conn| {
            conn.query_all("SELECT batch_id FROM session_state ORDER BY batch_id", &[], |row| {
                row.get(0)
            })
            .map_err(map_storage_error)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use brewops_core::MockClock;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, SqliteSessionStateRepository, MockClock) {
        let temp_dir = TempDir::new().unwrap();
        let db = DbManager::new(temp_dir.path().join("session.db"), 2).unwrap();
        db.run_migrations().unwrap();
        let clock = MockClock::new(5_000);
        let repo = SqliteSessionStateRepository::new(Arc::new(db), Arc::new(clock.clone()));
        (temp_dir, repo, clock)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn put_replaces_whole_record_and_stamps_time() {
        let (_dir, repo, clock) = setup();
        let mut first = SessionState::new("batch-1");
        first.notes = Some("hazy".into());
        first.record_measurement("og", json!(1.062));
        repo.put(&first).await.unwrap();

        clock.set(6_000);
        let mut second = SessionState::new("batch-1");
        second.current_step = Some("boil".into());
        let stored = repo.put(&second).await.unwrap();
        assert_eq!(stored.updated_at, 6_000);

        let loaded = repo.get("batch-1").await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(loaded.notes.is_none());
        assert!(loaded.measurements.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_and_remove_batches() {
        let (_dir, repo, _clock) = setup();
        repo.put(&SessionState::new("b-2")).await.unwrap();
        repo.put(&SessionState::new("b-1")).await.unwrap();

        assert_eq!(repo.list_batch_ids().await.unwrap(), vec!["b-1", "b-2"]);
        assert!(repo.remove("b-1").await.unwrap());
        assert!(repo.get("b-1").await.unwrap().is_none());
    }
}
