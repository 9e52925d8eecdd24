//! Retry policy with capped exponential backoff
//!
//! The first retry waits `base_delay`, each later one doubles it, and no window
//! exceeds `cap_delay`:
//!
//! ```text
//! retry_count:  1     2     3     4     5    ...
//! delay:        1s    2s    4s    8s    16s  ... (capped)
//! ```

use std::time::Duration;

use brewops_domain::OutboxConfig;

/// Outcome of evaluating one item against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub eligible_now: bool,
    /// Epoch ms from which the item may be dispatched again
    pub next_eligible_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    cap_delay: Duration,
    max_retry_count: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&OutboxConfig::default())
    }
}

impl From<&OutboxConfig> for RetryPolicy {
    fn from(config: &OutboxConfig) -> Self {
        Self::new(config.base_delay(), config.cap_delay(), config.max_retry_count)
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, cap_delay: Duration, max_retry_count: u32) -> Self {
        Self { base_delay, cap_delay: cap_delay.max(base_delay), max_retry_count }
    }

    pub const fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    /// Backoff window that follows the `retry_count`-th failure.
    ///
    /// Zero before any failure.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let exponent = retry_count - 1;
        let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier).min(self.cap_delay)
    }

    pub const fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retry_count
    }

    /// Whether an item may be dispatched at `now_ms`.
    ///
    /// Items that were never attempted are always eligible.
    pub fn evaluate(
        &self,
        retry_count: u32,
        last_attempt_at: Option<i64>,
        now_ms: i64,
    ) -> RetryDecision {
        let Some(last_attempt_at) = last_attempt_at else {
            return RetryDecision { eligible_now: true, next_eligible_at: now_ms };
        };
        let delay_ms =
            i64::try_from(self.backoff_delay(retry_count).as_millis()).unwrap_or(i64::MAX);
        let next_eligible_at = last_attempt_at.saturating_add(delay_ms);
        RetryDecision { eligible_now: now_ms >= next_eligible_at, next_eligible_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(60), 5)
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = policy();
        assert_eq!(policy.backoff_delay(0), Duration::ZERO);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(6), Duration::from_secs(32));
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for retry_count in 0..=200 {
            let delay = policy.backoff_delay(retry_count);
            assert!(delay >= previous, "delay shrank at retry {retry_count}");
            assert!(delay <= Duration::from_secs(60));
            previous = delay;
        }
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn evaluate_respects_window_boundary() {
        let policy = policy();
        let last = 10_000;

        let early = policy.evaluate(2, Some(last), last + 1_999);
        assert!(!early.eligible_now);
        assert_eq!(early.next_eligible_at, last + 2_000);

        assert!(policy.evaluate(2, Some(last), last + 2_000).eligible_now);
    }

    #[test]
    fn never_attempted_items_are_eligible() {
        let decision = policy().evaluate(0, None, 42);
        assert!(decision.eligible_now);
        assert_eq!(decision.next_eligible_at, 42);
    }

    #[test]
    fn exhaustion_starts_at_max_retry_count() {
        let policy = policy();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn cap_below_base_is_raised_to_base() {
        let policy = RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(1), 3);
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(5));
    }
}
