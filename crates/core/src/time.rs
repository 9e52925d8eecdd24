//! Time abstraction for testability
//!
//! Backoff windows, cache expiry and timer countdowns all read time through
//! [`Clock`] so they can be driven deterministically in tests.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use brewops_core::{Clock, MockClock};
//!
//! let clock = MockClock::new(1_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now_ms(), 6_000);
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_ms: Arc<AtomicI64>,
}

impl MockClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now_ms: Arc::new(AtomicI64::new(start_ms)) }
    }

    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = MockClock::new(0);
        let handle = clock.clone();
        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.now_ms(), 250);

        clock.set(10);
        assert_eq!(handle.now_ms(), 10);
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
