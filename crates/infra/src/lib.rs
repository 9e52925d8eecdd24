//! # BrewOps Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite repositories for the outbox, timers, cache and session state
//! - The sync manager and cleanup service background workers
//! - Connectivity monitoring
//! - HTTP operation handlers for the remote system of record
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `brewops-core`
//! - Depends on `brewops-common` and `brewops-domain`
//! - Contains all "impure" code (I/O, sockets, HTTP)

pub mod config;
pub mod database;
pub mod errors;
pub mod network;
pub mod remote;
pub mod sync;

// Re-export commonly used items
pub use database::{DbManager, GcReport, LocalStore};
pub use errors::InfraError;
pub use network::{ConnectivityMonitor, TcpReachabilityProbe};
pub use remote::{HttpHandlerConfig, HttpOperationHandler};
pub use sync::{
    CleanupService, CleanupServiceConfig, DrainOutcome, DrainReport, SyncManager,
    SyncManagerConfig,
};
