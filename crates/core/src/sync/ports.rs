//! Port interfaces for applying operations remotely

use async_trait::async_trait;
use brewops_domain::{OperationPayload, OperationScope};

use super::errors::SyncError;

/// Successful dispatch results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// The remote side recognised the idempotency key
    AlreadyApplied,
}

/// Applies one kind of operation against the remote system of record
///
/// The handler's payload type fixes which [`OperationKind`] it serves, so a
/// registry cannot route a payload to a handler of another kind.
///
/// [`OperationKind`]: brewops_domain::OperationKind
#[async_trait]
pub trait OperationHandler: Send + Sync + 'static {
    type Payload: OperationPayload;

    /// Apply `payload` remotely.
    ///
    /// `idempotency_key` must be forwarded so that repeated delivery has a
    /// single effect. No timeout is imposed by the caller.
    async fn apply(
        &self,
        payload: Self::Payload,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError>;
}
