//! Local store ports
//!
//! Four independently addressable collections. Each call is atomic on its
//! own; nothing here spans more than one record set.

pub mod ports;

pub use ports::{CacheStore, OutboxStore, SessionStateStore, TimerStore};
