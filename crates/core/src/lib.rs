//! # BrewOps Core
//!
//! Pure queue logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the local stores, connectivity and
//!   time
//! - Retry policy, operation dispatcher and queue-depth observers
//! - Timer and session state services
//!
//! ## Architecture Principles
//! - Only depends on `brewops-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod network;
pub mod session;
pub mod storage;
pub mod sync;
pub mod time;
pub mod timers;

pub use network::NetworkMonitor;
pub use session::SessionStateService;
pub use storage::{CacheStore, OutboxStore, SessionStateStore, TimerStore};
pub use sync::{
    DispatchOutcome, FailureClass, FnHandler, OperationDispatcher, OperationHandler,
    QueueDepthObservers, QueueDepthSubscription, RetryDecision, RetryPolicy, SyncError,
};
pub use time::{Clock, MockClock, SystemClock};
pub use timers::TimerService;
