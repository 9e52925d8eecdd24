//! Local store facade
//!
//! Bundles one repository per collection over a shared [`DbManager`] and owns
//! age-based garbage collection across them.

use std::sync::Arc;
use std::time::Duration;

use brewops_core::{CacheStore, Clock, OutboxStore, SessionStateStore, TimerStore};
use brewops_domain::{DatabaseConfig, Result};
use tracing::{info, instrument};

use super::cache_repository::SqliteCacheRepository;
use super::manager::DbManager;
use super::outbox_repository::SqliteOutboxRepository;
use super::session_state_repository::SqliteSessionStateRepository;
use super::timer_repository::SqliteTimerRepository;

/// Rows deleted by one garbage collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub outbox_items: usize,
    pub timers: usize,
    pub cache_entries: usize,
}

impl GcReport {
    pub fn total(&self) -> usize {
        self.outbox_items + self.timers + self.cache_entries
    }
}

pub struct LocalStore {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
    outbox: Arc<SqliteOutboxRepository>,
    timers: Arc<SqliteTimerRepository>,
    cache: Arc<SqliteCacheRepository>,
    session_state: Arc<SqliteSessionStateRepository>,
}

impl LocalStore {
    /// Build the repositories over an already migrated database.
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            outbox: Arc::new(SqliteOutboxRepository::new(Arc::clone(&db), Arc::clone(&clock))),
            timers: Arc::new(SqliteTimerRepository::new(Arc::clone(&db))),
            cache: Arc::new(SqliteCacheRepository::new(Arc::clone(&db), Arc::clone(&clock))),
            session_state: Arc::new(SqliteSessionStateRepository::new(
                Arc::clone(&db),
                Arc::clone(&clock),
            )),
            db,
            clock,
        }
    }

    /// Open the configured database, run migrations and build the store.
    pub fn open(config: &DatabaseConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = DbManager::open(config)?;
        Ok(Self::new(Arc::new(db), clock))
    }

    pub fn db(&self) -> &Arc<DbManager> {
        &self.db
    }

    pub fn outbox(&self) -> Arc<dyn OutboxStore> {
        Arc::clone(&self.outbox) as Arc<dyn OutboxStore>
    }

    pub fn timers(&self) -> Arc<dyn TimerStore> {
        Arc::clone(&self.timers) as Arc<dyn TimerStore>
    }

    pub fn cache(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.cache) as Arc<dyn CacheStore>
    }

    pub fn session_state(&self) -> Arc<dyn SessionStateStore> {
        Arc::clone(&self.session_state) as Arc<dyn SessionStateStore>
    }

    /// Delete data older than `older_than`.
    ///
    /// Outbox items created before the cutoff go regardless of status.
    /// Completed timers started before the cutoff go; running ones stay.
    /// Expired cache entries are swept as well.
    #[instrument(skip(self))]
    pub async fn garbage_collect(&self, older_than: Duration) -> Result<GcReport> {
        let horizon_ms = i64::try_from(older_than.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = self.clock.now_ms().saturating_sub(horizon_ms);

        let report = GcReport {
            outbox_items: self.outbox.delete_created_before(cutoff_ms).await?,
            timers: self.timers.delete_completed_before(cutoff_ms).await?,
            cache_entries: self.cache.sweep_expired().await?,
        };

        info!(
            cutoff_ms,
            outbox_items = report.outbox_items,
            timers = report.timers,
            cache_entries = report.cache_entries,
            "Local store garbage collection completed"
        );

        Ok(report)
    }
}
