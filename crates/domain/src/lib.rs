//! # BrewOps Domain
//!
//! Domain types for the offline outbox and the local state stores.
//!
//! This crate contains:
//! - Outbox items, operation kinds and their payload shapes
//! - Timer, cache entry and session state records
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other BrewOps crates
//! - Only external dependencies allowed
//! - Pure data structures; no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
