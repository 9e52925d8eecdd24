//! Common utilities shared across BrewOps crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `platform`: local persistence primitives (SQLite pool, connection
//!   wrapper, pragmas, storage errors)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;
