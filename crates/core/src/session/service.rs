//! Session state service
//!
//! The store only replaces whole records. [`SessionStateService::update`]
//! reads, applies a closure and writes back, which gives field-level merge for
//! a single writer. It takes no lock: a concurrent writer between the read and
//! the write is overwritten, and the last write wins.

use std::sync::Arc;

use brewops_domain::{Result, SessionState};

use crate::storage::SessionStateStore;

pub struct SessionStateService {
    store: Arc<dyn SessionStateStore>,
}

impl SessionStateService {
    pub fn new(store: Arc<dyn SessionStateStore>) -> Self {
        Self { store }
    }

    /// Stored state, or an empty record for a batch never written
    pub async fn load(&self, batch_id: &str) -> Result<SessionState> {
        Ok(self.store.get(batch_id).await?.unwrap_or_else(|| SessionState::new(batch_id)))
    }

    pub async fn replace(&self, state: &SessionState) -> Result<SessionState> {
        self.store.put(state).await
    }

    /// Read-modify-write of one batch's record
    pub async fn update<F>(&self, batch_id: &str, apply: F) -> Result<SessionState>
    where
        F: FnOnce(&mut SessionState) + Send,
    {
        let mut state = self.load(batch_id).await?;
        apply(&mut state);
        state.batch_id = batch_id.to_string();
        self.store.put(&state).await
    }

    pub async fn clear(&self, batch_id: &str) -> Result<bool> {
        self.store.remove(batch_id).await
    }
}
