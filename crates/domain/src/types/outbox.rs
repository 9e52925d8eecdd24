//! Outbox item and its lifecycle types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::operation::Operation;

/// Owning workspace and user, carried to handlers for authorization context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationScope {
    pub workspace_id: String,
    pub user_id: String,
}

impl OperationScope {
    pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { workspace_id: workspace_id.into(), user_id: user_id.into() }
    }
}

/// Outbox item state
///
/// `Failed` is terminal: the drain never dispatches it again and only an
/// explicit removal, clear or garbage collection deletes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Failed,
}

crate::impl_domain_status_conversions!(OutboxStatus {
    Pending => "pending",
    Failed => "failed",
});

/// Producer request: what to do and on whose behalf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    pub operation: Operation,
    pub scope: OperationScope,
}

impl NewOperation {
    pub fn new(operation: impl Into<Operation>, scope: OperationScope) -> Self {
        Self { operation: operation.into(), scope }
    }
}

/// Unit of durable work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxItem {
    pub id: String, // UUIDv7
    pub operation_type: String,
    pub payload: serde_json::Value,
    pub scope: OperationScope,
    /// Epoch milliseconds; defines drain order
    pub created_at: i64,
    /// Generated once, never reused
    pub idempotency_key: String,
    pub retry_count: u32,
    pub last_attempt_at: Option<i64>,
    pub error: Option<String>,
    pub status: OutboxStatus,
}

impl OutboxItem {
    /// Build a fresh pending item with new identifiers.
    ///
    /// # Errors
    /// Fails only if the payload cannot be encoded as JSON.
    pub fn new(request: NewOperation, now_ms: i64) -> serde_json::Result<Self> {
        let payload = request.operation.payload_value()?;
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            operation_type: request.operation.kind().to_string(),
            payload,
            scope: request.scope,
            created_at: now_ms,
            idempotency_key: Uuid::new_v4().to_string(),
            retry_count: 0,
            last_attempt_at: None,
            error: None,
            status: OutboxStatus::Pending,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status == OutboxStatus::Failed
    }
}

/// Partial update merged into a stored item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxItemUpdate {
    pub retry_count: Option<u32>,
    pub error: Option<String>,
    pub status: Option<OutboxStatus>,
}

impl OutboxItemUpdate {
    /// Failed attempt that stays eligible for retry.
    pub fn attempt_failed(retry_count: u32, error: impl Into<String>) -> Self {
        Self { retry_count: Some(retry_count), error: Some(error.into()), status: None }
    }

    /// Terminal marking; the retry count is left untouched.
    pub fn terminal(error: impl Into<String>) -> Self {
        Self { retry_count: None, error: Some(error.into()), status: Some(OutboxStatus::Failed) }
    }

    pub fn is_empty(&self) -> bool {
        self.retry_count.is_none() && self.error.is_none() && self.status.is_none()
    }

    /// Whether the store should stamp `last_attempt_at`.
    pub fn touches_attempt(&self) -> bool {
        self.retry_count.is_some() || self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::operation::BatchStatusTransition;

    fn request() -> NewOperation {
        NewOperation::new(
            BatchStatusTransition {
                batch_id: "batch-7".into(),
                from_status: "fermenting".into(),
                to_status: "conditioning".into(),
                changed_at: 10,
            },
            OperationScope::new("ws-1", "user-1"),
        )
    }

    #[test]
    fn new_item_starts_pending_with_fresh_keys() {
        let first = OutboxItem::new(request(), 1_000).unwrap();
        let second = OutboxItem::new(request(), 1_000).unwrap();

        assert_eq!(first.operation_type, "batch_status_transition");
        assert_eq!(first.status, OutboxStatus::Pending);
        assert_eq!(first.retry_count, 0);
        assert!(first.last_attempt_at.is_none());
        assert_ne!(first.id, second.id);
        assert_ne!(first.idempotency_key, second.idempotency_key);
    }

    #[test]
    fn update_helpers_flag_attempt_stamping() {
        assert!(OutboxItemUpdate::attempt_failed(2, "timeout").touches_attempt());
        assert!(OutboxItemUpdate::terminal("rejected").touches_attempt());
        let status_only =
            OutboxItemUpdate { status: Some(OutboxStatus::Failed), ..Default::default() };
        assert!(!status_only.touches_attempt());
        assert!(OutboxItemUpdate::default().is_empty());
    }
}
