//! Operation dispatcher registry
//!
//! Routes an outbox item's `operation_type` tag to the handler registered for
//! that kind. Typed handlers are erased behind [`ErasedHandler`] so one map can
//! hold every kind.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use brewops_domain::{OperationKind, OperationPayload, OperationScope};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::errors::SyncError;
use super::ports::{DispatchOutcome, OperationHandler};

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn apply_value(
        &self,
        payload: &serde_json::Value,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError>;
}

struct TypedHandler<H> {
    inner: H,
}

#[async_trait]
impl<H> ErasedHandler for TypedHandler<H>
where
    H: OperationHandler,
{
    async fn apply_value(
        &self,
        payload: &serde_json::Value,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError> {
        let payload = serde_json::from_value::<H::Payload>(payload.clone())
            .map_err(|err| SyncError::InvalidPayload(err.to_string()))?;
        self.inner.apply(payload, idempotency_key, scope).await
    }
}

/// Registry from operation kind to handler
#[derive(Default)]
pub struct OperationDispatcher {
    handlers: RwLock<HashMap<OperationKind, Arc<dyn ErasedHandler>>>,
}

impl OperationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for its payload's kind, replacing any previous one.
    pub fn register<H>(&self, handler: H)
    where
        H: OperationHandler,
    {
        let kind = <H::Payload as OperationPayload>::KIND;
        let erased: Arc<dyn ErasedHandler> = Arc::new(TypedHandler { inner: handler });
        if self.handlers.write().insert(kind, erased).is_some() {
            warn!(operation_type = %kind, "Replaced existing operation handler");
        } else {
            debug!(operation_type = %kind, "Registered operation handler");
        }
    }

    pub fn is_registered(&self, kind: OperationKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    pub fn registered_kinds(&self) -> Vec<OperationKind> {
        self.handlers.read().keys().copied().collect()
    }

    /// Kinds that would currently dispatch to `NoHandler`, in declaration order.
    pub fn unhandled_kinds(&self) -> Vec<OperationKind> {
        OperationKind::ALL.into_iter().filter(|kind| !self.is_registered(*kind)).collect()
    }

    /// Route a stored operation to its handler.
    ///
    /// # Errors
    /// - `UnknownOperation` when the tag names no operation kind
    /// - `NoHandler` when the kind has no registered handler
    /// - `InvalidPayload` when the payload does not decode into the handler's
    ///   payload type
    /// - whatever the handler itself reports
    pub async fn dispatch(
        &self,
        operation_type: &str,
        payload: &serde_json::Value,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError> {
        let kind: OperationKind = operation_type
            .parse()
            .map_err(|_| SyncError::UnknownOperation(operation_type.to_string()))?;

        // Clone the Arc so the lock is not held across the await.
        let handler = self
            .handlers
            .read()
            .get(&kind)
            .cloned()
            .ok_or_else(|| SyncError::NoHandler(kind.to_string()))?;

        handler.apply_value(payload, idempotency_key, scope).await
    }
}

impl std::fmt::Debug for OperationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDispatcher")
            .field("registered_kinds", &self.registered_kinds())
            .finish()
    }
}

/// Handler built from an async closure, mostly useful for wiring and tests.
pub struct FnHandler<P, F> {
    func: F,
    _payload: PhantomData<fn(P)>,
}

impl<P, F, Fut> FnHandler<P, F>
where
    P: OperationPayload,
    F: Fn(P, String, OperationScope) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<DispatchOutcome, SyncError>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func, _payload: PhantomData }
    }
}

#[async_trait]
impl<P, F, Fut> OperationHandler for FnHandler<P, F>
where
    P: OperationPayload,
    F: Fn(P, String, OperationScope) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<DispatchOutcome, SyncError>> + Send + 'static,
{
    type Payload = P;

    async fn apply(
        &self,
        payload: P,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError> {
        (self.func)(payload, idempotency_key.to_string(), scope.clone()).await
    }
}
