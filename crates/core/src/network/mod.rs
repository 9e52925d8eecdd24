//! Connectivity port

use brewops_domain::Connectivity;
use tokio::sync::broadcast;

/// Observes reachability of the remote system of record.
///
/// Implementations send exactly one event per genuine online/offline edge;
/// repeated reports of the same state are not forwarded.
pub trait NetworkMonitor: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receiver for transition events from now on
    fn subscribe(&self) -> broadcast::Receiver<Connectivity>;
}
