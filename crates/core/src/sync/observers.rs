//! Queue-depth observers
//!
//! UI code subscribes to learn how many items are still pending. A new
//! listener is called once immediately so it can render without waiting for
//! the next drain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Registry {
    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Listener registry shared by clones
#[derive(Clone, Default)]
pub struct QueueDepthObservers {
    registry: Arc<Registry>,
}

impl QueueDepthObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` and invoke it once with `current`.
    ///
    /// The listener stays registered until the returned subscription is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, listener: F, current: usize) -> QueueDepthSubscription
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        self.registry.listeners.lock().push((id, Arc::clone(&listener)));
        listener(current);
        QueueDepthSubscription { id, registry: Arc::downgrade(&self.registry) }
    }

    /// Invoke every listener with `pending`.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe from inside the callback.
    pub fn notify(&self, pending: usize) {
        let snapshot: Vec<Listener> =
            self.registry.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in snapshot {
            listener(pending);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }
}

impl std::fmt::Debug for QueueDepthObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueDepthObservers").field("listeners", &self.listener_count()).finish()
    }
}

/// Handle returned by [`QueueDepthObservers::subscribe`]
#[derive(Debug)]
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct QueueDepthSubscription {
    id: u64,
    registry: Weak<Registry>,
}

impl QueueDepthSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for QueueDepthSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
