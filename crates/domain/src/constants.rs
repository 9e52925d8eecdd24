//! Domain-level constants

/// Terminal marker stored in `OutboxItem::error` once retries are exhausted.
pub const MAX_RETRIES_EXCEEDED: &str = "max retries exceeded";

/// Upper bound on persisted error descriptions.
pub const MAX_ERROR_LENGTH: usize = 256;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;
