//! Batch-scoped countdown timers
//!
//! All arithmetic takes the current time as an argument so the countdown is
//! deterministic under an injected clock.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Countdown attached to a production batch (boil additions, rests, dry hop)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: String,
    pub batch_id: String,
    pub name: String,
    /// Epoch ms; rebased on resume so elapsed time excludes pauses
    pub started_at: i64,
    pub duration_ms: i64,
    pub paused: bool,
    pub paused_at: Option<i64>,
    /// Snapshot taken when paused
    pub remaining_ms: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<i64>,
}

impl Timer {
    pub fn new(
        batch_id: impl Into<String>,
        name: impl Into<String>,
        duration_ms: i64,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            batch_id: batch_id.into(),
            name: name.into(),
            started_at: now,
            duration_ms: duration_ms.max(0),
            paused: false,
            paused_at: None,
            remaining_ms: None,
            completed: false,
            completed_at: None,
        }
    }

    /// Remaining countdown at `now`, never negative.
    pub fn remaining_at(&self, now: i64) -> i64 {
        if self.completed {
            return 0;
        }
        if self.paused {
            return self.remaining_ms.unwrap_or(self.duration_ms).max(0);
        }
        let elapsed = now.saturating_sub(self.started_at);
        self.duration_ms.saturating_sub(elapsed).max(0)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        !self.completed && self.remaining_at(now) == 0
    }

    /// Freeze the countdown. Returns `false` if already paused.
    pub fn pause_at(&mut self, now: i64) -> bool {
        if self.paused {
            return false;
        }
        self.remaining_ms = Some(self.remaining_at(now));
        self.paused = true;
        self.paused_at = Some(now);
        true
    }

    /// Continue from the paused snapshot. Returns `false` if not paused.
    pub fn resume_at(&mut self, now: i64) -> bool {
        if !self.paused {
            return false;
        }
        let remaining = self.remaining_ms.unwrap_or(self.duration_ms);
        self.started_at = now.saturating_sub(self.duration_ms.saturating_sub(remaining));
        self.paused = false;
        self.paused_at = None;
        self.remaining_ms = None;
        true
    }

    pub fn complete_at(&mut self, now: i64) {
        self.completed = true;
        self.completed_at = Some(now);
        self.paused = false;
        self.paused_at = None;
        self.remaining_ms = Some(0);
    }
}
