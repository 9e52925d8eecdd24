//! Port interfaces for the durable store

use std::time::Duration;

use async_trait::async_trait;
use brewops_domain::{
    CacheEntry, OperationScope, OutboxItem, OutboxItemUpdate, Result, SessionState, Timer,
};

/// Trait for the outbox collection
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persist a new item and return its id.
    ///
    /// Storage failures are returned to the caller, never swallowed.
    async fn enqueue(&self, item: &OutboxItem) -> Result<String>;

    /// Pending items in ascending `created_at` order (insertion order on ties)
    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxItem>>;

    async fn get(&self, id: &str) -> Result<Option<OutboxItem>>;

    /// Merge `update` into the stored item.
    ///
    /// `retry_count` never decreases and `last_attempt_at` is stamped when
    /// retry-related fields change. Returns `NotFound` when no item matches.
    async fn update(&self, id: &str, update: &OutboxItemUpdate) -> Result<()>;

    /// Returns whether an item was deleted
    async fn remove(&self, id: &str) -> Result<bool>;

    /// All items, terminal ones included
    async fn count(&self) -> Result<usize>;

    async fn count_pending(&self) -> Result<usize>;

    /// Terminal items kept for inspection
    async fn list_failed(&self, limit: usize) -> Result<Vec<OutboxItem>>;

    async fn list_by_scope(&self, scope: &OperationScope) -> Result<Vec<OutboxItem>>;

    /// Remove every item; returns how many were deleted
    async fn clear(&self) -> Result<usize>;

    /// Delete items created before `cutoff_ms` regardless of status
    async fn delete_created_before(&self, cutoff_ms: i64) -> Result<usize>;
}

/// Trait for batch timers
#[async_trait]
pub trait TimerStore: Send + Sync {
    async fn insert(&self, timer: &Timer) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Timer>>;

    /// Replace the stored timer with `timer`
    async fn save(&self, timer: &Timer) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<bool>;

    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Timer>>;

    /// Delete completed timers started before `cutoff_ms`
    async fn delete_completed_before(&self, cutoff_ms: i64) -> Result<usize>;
}

/// Trait for the expiring key/value cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns `None` for missing or expired keys; expired entries are deleted
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: Option<Duration>)
        -> Result<()>;

    async fn remove(&self, key: &str) -> Result<bool>;

    /// Delete every expired entry; returns how many were deleted
    async fn sweep_expired(&self) -> Result<usize>;

    async fn clear(&self) -> Result<usize>;
}

/// Trait for per-batch session state
#[async_trait]
pub trait SessionStateStore: Send + Sync {
    async fn get(&self, batch_id: &str) -> Result<Option<SessionState>>;

    /// Replace the whole record and return it with `updated_at` stamped
    async fn put(&self, state: &SessionState) -> Result<SessionState>;

    async fn remove(&self, batch_id: &str) -> Result<bool>;

    async fn list_batch_ids(&self) -> Result<Vec<String>>;
}
