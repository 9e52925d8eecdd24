//! In-process connectivity monitor
//!
//! Holds the current reachability and broadcasts a [`Connectivity`] event on
//! every genuine edge. Host adapters (or tests) report state through
//! [`ConnectivityMonitor::set_online`]; repeated reports of the same state are
//! swallowed.

use std::sync::atomic::{AtomicBool, Ordering};

use brewops_core::NetworkMonitor;
use brewops_domain::Connectivity;
use tokio::sync::broadcast;
use tracing::info;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
    events: broadcast::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { online: AtomicBool::new(initial.is_online()), events }
    }

    pub fn online() -> Self {
        Self::new(Connectivity::Online)
    }

    pub fn offline() -> Self {
        Self::new(Connectivity::Offline)
    }

    /// Record the latest reachability sample.
    ///
    /// Returns `true` when this changed the state (and an event was sent).
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous == online {
            return false;
        }

        let state = Connectivity::from_online(online);
        info!(connectivity = %state, "Connectivity changed");
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(state);
        true
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::from_online(self.is_online())
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::online()
    }
}

impl NetworkMonitor for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<Connectivity> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    #[test]
    fn emits_once_per_edge() {
        let monitor = ConnectivityMonitor::offline();
        let mut events = monitor.subscribe();

        assert!(!monitor.set_online(false));
        assert!(monitor.set_online(true));
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));

        assert_eq!(events.try_recv().unwrap(), Connectivity::Online);
        assert_eq!(events.try_recv().unwrap(), Connectivity::Offline);
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn reports_current_state() {
        let monitor = ConnectivityMonitor::default();
        assert!(monitor.is_online());
        monitor.set_online(false);
        assert_eq!(monitor.connectivity(), Connectivity::Offline);
    }

    #[test]
    fn late_subscribers_only_see_later_edges() {
        let monitor = ConnectivityMonitor::online();
        monitor.set_online(false);

        let mut events = monitor.subscribe();
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        monitor.set_online(true);
        assert_eq!(events.try_recv().unwrap(), Connectivity::Online);
    }
}
