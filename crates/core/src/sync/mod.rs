//! Outbox drain building blocks
//!
//! The orchestration loop lives in the infrastructure crate; everything it
//! decides with is here and free of I/O.

pub mod dispatcher;
pub mod errors;
pub mod observers;
pub mod ports;
pub mod retry;

pub use dispatcher::{FnHandler, OperationDispatcher};
pub use errors::{FailureClass, SyncError};
pub use observers::{QueueDepthObservers, QueueDepthSubscription};
pub use ports::{DispatchOutcome, OperationHandler};
pub use retry::{RetryDecision, RetryPolicy};
