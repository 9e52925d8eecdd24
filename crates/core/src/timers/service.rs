//! Timer service - countdown lifecycle over the timer store

use std::sync::Arc;

use brewops_domain::{BrewOpsError, Result, Timer};
use tracing::{debug, instrument};

use crate::storage::TimerStore;
use crate::time::Clock;

pub struct TimerService {
    store: Arc<dyn TimerStore>,
    clock: Arc<dyn Clock>,
}

impl TimerService {
    pub fn new(store: Arc<dyn TimerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create and persist a running timer.
    #[instrument(skip(self, name))]
    pub async fn start_timer(
        &self,
        batch_id: &str,
        name: impl Into<String> + Send,
        duration_ms: i64,
    ) -> Result<Timer> {
        if duration_ms <= 0 {
            return Err(BrewOpsError::InvalidInput(format!(
                "timer duration must be positive, got {duration_ms}ms"
            )));
        }
        let timer = Timer::new(batch_id, name, duration_ms, self.clock.now_ms());
        self.store.insert(&timer).await?;
        debug!(timer_id = %timer.id, "Started timer");
        Ok(timer)
    }

    /// Freeze the countdown. Pausing a paused timer changes nothing.
    pub async fn pause(&self, id: &str) -> Result<Timer> {
        let mut timer = self.load_active(id).await?;
        if timer.pause_at(self.clock.now_ms()) {
            self.store.save(&timer).await?;
        }
        Ok(timer)
    }

    /// Continue a paused countdown. Resuming a running timer changes nothing.
    pub async fn resume(&self, id: &str) -> Result<Timer> {
        let mut timer = self.load_active(id).await?;
        if timer.resume_at(self.clock.now_ms()) {
            self.store.save(&timer).await?;
        }
        Ok(timer)
    }

    pub async fn complete(&self, id: &str) -> Result<Timer> {
        let mut timer = self.load_active(id).await?;
        timer.complete_at(self.clock.now_ms());
        self.store.save(&timer).await?;
        Ok(timer)
    }

    /// Remaining countdown in milliseconds
    pub async fn remaining(&self, id: &str) -> Result<i64> {
        let timer = self.load(id).await?;
        Ok(timer.remaining_at(self.clock.now_ms()))
    }

    pub async fn list_for_batch(&self, batch_id: &str) -> Result<Vec<Timer>> {
        self.store.list_by_batch(batch_id).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.store.remove(id).await
    }

    async fn load(&self, id: &str) -> Result<Timer> {
        self.store.get(id).await?.ok_or_else(|| BrewOpsError::NotFound(format!("timer {id}")))
    }

    async fn load_active(&self, id: &str) -> Result<Timer> {
        let timer = self.load(id).await?;
        if timer.completed {
            return Err(BrewOpsError::InvalidInput(format!("timer {id} is already completed")));
        }
        Ok(timer)
    }
}
