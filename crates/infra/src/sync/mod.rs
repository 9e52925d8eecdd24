//! Background synchronization services
//!
//! - `SyncManager`: drains the outbox on a timer, on reconnect and on demand
//! - `CleanupService`: periodic age-based garbage collection of local data
//!
//! Both track their join handles, cancel explicitly and bound the wait on
//! stop.

pub mod cleanup;
pub mod manager;

pub use cleanup::{CleanupService, CleanupServiceConfig, CleanupStats};
pub use manager::{DrainOutcome, DrainReport, SyncManager, SyncManagerConfig};
