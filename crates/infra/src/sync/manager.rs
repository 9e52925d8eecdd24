//! Sync manager: drains the outbox against the remote system of record.
//!
//! The manager owns a single in-flight drain guard, a periodic drain loop and
//! a connectivity listener that drains as soon as the monitor reports an
//! online edge. Every collaborator is injected, so several isolated managers
//! can run side by side (tests do exactly that).
//!
//! Per pass, pending items are visited in ascending `created_at` order:
//!
//! 1. items whose retries are exhausted are marked terminal without dispatch
//! 2. items still inside their backoff window are skipped
//! 3. everything else is dispatched, and the outcome is committed back
//!
//! Dispatch failures never escape a pass; they are recorded on the item.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use brewops_core::{OperationDispatcher, SystemClock};
//! use brewops_domain::{Config, FermentationReading, NewOperation, OperationScope};
//! use brewops_infra::database::LocalStore;
//! use brewops_infra::network::ConnectivityMonitor;
//! use brewops_infra::sync::{SyncManager, SyncManagerConfig};
//!
//! # async fn example() -> brewops_domain::Result<()> {
//! let config = Config::default();
//! let clock = Arc::new(SystemClock);
//! let store = LocalStore::open(&config.database, clock.clone())?;
//! let manager = SyncManager::new(
//!     store.outbox(),
//!     Arc::new(OperationDispatcher::new()),
//!     Arc::new(ConnectivityMonitor::online()),
//!     clock,
//!     SyncManagerConfig::from(&config.outbox),
//! );
//!
//! manager.start().await?;
//! let reading = FermentationReading {
//!     batch_id: "batch-42".into(),
//!     gravity: 1.018,
//!     temperature_c: 19.5,
//!     ph: Some(4.4),
//!     recorded_at: 1_735_000_000_000,
//!     notes: None,
//! };
//! manager.enqueue(NewOperation::new(reading, OperationScope::new("ws", "user"))).await?;
//! manager.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use brewops_core::{
    Clock, FailureClass, NetworkMonitor, OperationDispatcher, OutboxStore, QueueDepthObservers,
    QueueDepthSubscription, RetryPolicy,
};
use brewops_domain::constants::{MAX_ERROR_LENGTH, MAX_RETRIES_EXCEEDED};
use brewops_domain::{
    BrewOpsError, Connectivity, NewOperation, OutboxConfig, OutboxItem, OutboxItemUpdate, Result,
};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type TaskHandles = Arc<tokio::sync::Mutex<Vec<JoinHandle<()>>>>;

/// Configuration for the sync manager
#[derive(Debug, Clone)]
pub struct SyncManagerConfig {
    /// Maximum number of pending items visited per pass
    pub batch_size: usize,
    /// Period of the background drain
    pub drain_interval: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
    /// Backoff and exhaustion rules applied per item
    pub retry_policy: RetryPolicy,
}

impl Default for SyncManagerConfig {
    fn default() -> Self {
        Self::from(&OutboxConfig::default())
    }
}

impl From<&OutboxConfig> for SyncManagerConfig {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            drain_interval: config.drain_interval(),
            join_timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy::from(config),
        }
    }
}

/// Result of a drain request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was in flight; nothing was done
    AlreadyRunning,
    /// The monitor reported offline; no attempts were made
    Offline,
    /// A pass ran to the end
    Completed(DrainReport),
}

impl DrainOutcome {
    /// Counters of the pass, if one ran
    pub const fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::AlreadyRunning | Self::Offline => None,
        }
    }
}

/// Counters for one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items read from the store
    pub visited: usize,
    /// Items handed to the dispatcher
    pub dispatched: usize,
    /// Items removed after success or duplicate detection
    pub removed: usize,
    /// Items left pending with an incremented retry count
    pub retried: usize,
    /// Items marked terminal during this pass
    pub failed: usize,
    /// Items held back by their backoff window
    pub skipped: usize,
    /// Store reads or writes that failed during the pass
    pub storage_errors: usize,
    /// Pending count after the pass, when it could be read
    pub pending_after: Option<usize>,
}

/// Shared state reachable from the background tasks
struct SyncCore {
    store: Arc<dyn OutboxStore>,
    dispatcher: Arc<OperationDispatcher>,
    monitor: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    observers: QueueDepthObservers,
    config: SyncManagerConfig,
    draining: AtomicBool,
    drain_released: Notify,
}

/// Releases the drain flag when the pass ends, even by panic.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
    released: &'a Notify,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool, released: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, released })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.released.notify_waiters();
    }
}

impl SyncCore {
    async fn drain_once(&self) -> DrainOutcome {
        // Checked before taking the guard so an offline no-op never blocks the
        // drain triggered by the online edge.
        if !self.monitor.is_online() {
            debug!("Offline; skipping drain");
            return DrainOutcome::Offline;
        }

        let Some(_guard) = DrainGuard::acquire(&self.draining, &self.drain_released) else {
            debug!("Drain already in flight; skipping request");
            return DrainOutcome::AlreadyRunning;
        };

        let report = self.run_pass().await;
        if let Some(pending) = report.pending_after {
            self.observers.notify(pending);
        }

        if report.visited > 0 || report.storage_errors > 0 {
            info!(
                visited = report.visited,
                dispatched = report.dispatched,
                removed = report.removed,
                retried = report.retried,
                failed = report.failed,
                skipped = report.skipped,
                storage_errors = report.storage_errors,
                "Drain pass completed"
            );
        }

        DrainOutcome::Completed(report)
    }

    /// Drain after an online edge.
    ///
    /// A pass already in flight may have listed the queue before the edge, so
    /// instead of giving up on `AlreadyRunning` this waits for it to finish and
    /// tries again.
    async fn drain_after_reconnect(&self) -> DrainOutcome {
        loop {
            let released = self.drain_released.notified();
            tokio::pin!(released);
            // Register before trying so a release in between is not missed.
            released.as_mut().enable();

            match self.drain_once().await {
                DrainOutcome::AlreadyRunning => released.await,
                outcome => return outcome,
            }
        }
    }

    async fn run_pass(&self) -> DrainReport {
        let mut report = DrainReport::default();

        match self.store.list_pending(self.config.batch_size).await {
            Ok(items) => {
                for item in items {
                    report.visited += 1;
                    self.process_item(&item, &mut report).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to list pending outbox items");
                report.storage_errors += 1;
            }
        }

        match self.store.count_pending().await {
            Ok(pending) => report.pending_after = Some(pending),
            Err(err) => {
                warn!(error = %err, "Failed to count pending outbox items");
                report.storage_errors += 1;
            }
        }

        report
    }

    async fn process_item(&self, item: &OutboxItem, report: &mut DrainReport) {
        let policy = &self.config.retry_policy;

        if policy.is_exhausted(item.retry_count) {
            warn!(
                item_id = %item.id,
                operation_type = %item.operation_type,
                retry_count = item.retry_count,
                "Retries exhausted; marking outbox item terminal"
            );
            let update = OutboxItemUpdate::terminal(MAX_RETRIES_EXCEEDED);
            self.commit_update(item, &update, report).await;
            report.failed += 1;
            return;
        }

        let decision = policy.evaluate(item.retry_count, item.last_attempt_at, self.clock.now_ms());
        if !decision.eligible_now {
            debug!(
                item_id = %item.id,
                retry_count = item.retry_count,
                next_eligible_at = decision.next_eligible_at,
                "Outbox item still backing off"
            );
            report.skipped += 1;
            return;
        }

        report.dispatched += 1;
        let result = self
            .dispatcher
            .dispatch(&item.operation_type, &item.payload, &item.idempotency_key, &item.scope)
            .await;

        let err = match result {
            Ok(outcome) => {
                debug!(item_id = %item.id, ?outcome, "Dispatched outbox item");
                self.commit_removal(item, report).await;
                return;
            }
            Err(err) => err,
        };

        match err.category() {
            FailureClass::Duplicate => {
                debug!(item_id = %item.id, error = %err, "Remote already applied outbox item");
                self.commit_removal(item, report).await;
            }
            FailureClass::Transient => {
                let retry_count = item.retry_count.saturating_add(1);
                debug!(
                    item_id = %item.id,
                    operation_type = %item.operation_type,
                    retry_count,
                    error = %err,
                    "Transient dispatch failure"
                );
                let reason = truncate_reason(&err.to_string());
                let update = OutboxItemUpdate::attempt_failed(retry_count, reason);
                self.commit_update(item, &update, report).await;
                report.retried += 1;
            }
            FailureClass::Permanent | FailureClass::Conflict => {
                warn!(
                    item_id = %item.id,
                    operation_type = %item.operation_type,
                    error = %err,
                    "Permanent dispatch failure; marking outbox item terminal"
                );
                let update = OutboxItemUpdate::terminal(truncate_reason(&err.to_string()));
                self.commit_update(item, &update, report).await;
                report.failed += 1;
            }
        }
    }

    async fn commit_removal(&self, item: &OutboxItem, report: &mut DrainReport) {
        match self.store.remove(&item.id).await {
            Ok(true) => report.removed += 1,
            Ok(false) => debug!(item_id = %item.id, "Outbox item already removed"),
            Err(err) => {
                warn!(item_id = %item.id, error = %err, "Failed to remove outbox item");
                report.storage_errors += 1;
            }
        }
    }

    async fn commit_update(
        &self,
        item: &OutboxItem,
        update: &OutboxItemUpdate,
        report: &mut DrainReport,
    ) {
        if let Err(err) = self.store.update(&item.id, update).await {
            warn!(item_id = %item.id, error = %err, "Failed to update outbox item");
            report.storage_errors += 1;
        }
    }

    async fn notify_pending(&self) {
        match self.store.count_pending().await {
            Ok(pending) => self.observers.notify(pending),
            Err(err) => warn!(error = %err, "Failed to count pending outbox items"),
        }
    }
}

/// Outbox orchestrator with explicit lifecycle management.
pub struct SyncManager {
    core: Arc<SyncCore>,
    cancellation_token: Mutex<CancellationToken>,
    task_handles: TaskHandles,
}

impl SyncManager {
    /// Build a stopped manager around the injected collaborators.
    pub fn new(
        store: Arc<dyn OutboxStore>,
        dispatcher: Arc<OperationDispatcher>,
        monitor: Arc<dyn NetworkMonitor>,
        clock: Arc<dyn Clock>,
        config: SyncManagerConfig,
    ) -> Self {
        Self {
            core: Arc::new(SyncCore {
                store,
                dispatcher,
                monitor,
                clock,
                observers: QueueDepthObservers::new(),
                config,
                draining: AtomicBool::new(false),
                drain_released: Notify::new(),
            }),
            cancellation_token: Mutex::new(CancellationToken::new()),
            task_handles: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    /// Persist a new operation and return its id.
    ///
    /// Never touches the network; observers receive the new pending count.
    ///
    /// # Errors
    /// Storage failures are returned as-is.
    #[instrument(skip(self, request), fields(operation_type = %request.operation.kind()))]
    pub async fn enqueue(&self, request: NewOperation) -> Result<String> {
        let item = OutboxItem::new(request, self.core.clock.now_ms())?;
        let id = self.core.store.enqueue(&item).await?;
        debug!(item_id = %id, "Enqueued outbox item");
        self.core.notify_pending().await;
        Ok(id)
    }

    /// Run one drain pass unless one is already in flight or we are offline.
    #[instrument(skip(self))]
    pub async fn drain_once(&self) -> DrainOutcome {
        self.core.drain_once().await
    }

    /// Manual drain trigger.
    pub async fn force_sync_now(&self) -> DrainOutcome {
        self.drain_once().await
    }

    /// Current connectivity as reported by the monitor.
    pub fn is_online(&self) -> bool {
        self.core.monitor.is_online()
    }

    /// Whether a drain pass is in flight right now.
    pub fn is_draining(&self) -> bool {
        self.core.draining.load(Ordering::Acquire)
    }

    /// Handler registry used by every pass.
    pub fn dispatcher(&self) -> &Arc<OperationDispatcher> {
        &self.core.dispatcher
    }

    /// Number of items still awaiting delivery.
    ///
    /// # Errors
    /// Storage failures are returned as-is.
    pub async fn pending_count(&self) -> Result<usize> {
        self.core.store.count_pending().await
    }

    /// Register a queue-depth listener; it is called once right away.
    ///
    /// # Errors
    /// Returns an error if the current pending count cannot be read.
    pub async fn subscribe_queue_depth<F>(&self, listener: F) -> Result<QueueDepthSubscription>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let current = self.core.store.count_pending().await?;
        Ok(self.core.observers.subscribe(listener, current))
    }

    /// Spawn the periodic drain loop and the connectivity listener.
    ///
    /// The first periodic drain runs immediately.
    ///
    /// # Errors
    /// Returns an error if the manager is already running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut handles = self.task_handles.lock().await;
        if handles.iter().any(|handle| !handle.is_finished()) {
            return Err(BrewOpsError::Internal("Sync manager already running".into()));
        }
        handles.clear();

        info!(
            drain_interval = ?self.core.config.drain_interval,
            batch_size = self.core.config.batch_size,
            "Starting sync manager"
        );
        for kind in self.core.dispatcher.unhandled_kinds() {
            warn!(operation_type = %kind, "No handler registered; items of this kind will fail");
        }

        // Fresh token so the manager can be restarted after stop
        let cancel = CancellationToken::new();
        *self.cancellation_token.lock() = cancel.clone();

        // Subscribe before spawning so an edge right after start is not lost.
        let transitions = self.core.monitor.subscribe();

        handles.push(tokio::spawn(Self::drain_loop(Arc::clone(&self.core), cancel.clone())));
        handles.push(tokio::spawn(Self::connectivity_loop(
            Arc::clone(&self.core),
            transitions,
            cancel,
        )));

        info!("Sync manager started");
        Ok(())
    }

    /// Cancel the background tasks and wait for them to finish.
    ///
    /// An in-flight dispatch is not interrupted; it delays the join up to the
    /// configured join timeout.
    ///
    /// # Errors
    /// Returns an error if the manager is not running or a task fails to stop.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().await.drain(..).collect();
        if handles.is_empty() {
            return Err(BrewOpsError::Internal("Sync manager not running".into()));
        }

        info!("Stopping sync manager");
        self.cancellation_token.lock().cancel();

        let join_timeout = self.core.config.join_timeout;
        let mut first_error = None;
        for handle in handles {
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Sync manager task panicked: {}", e);
                    first_error.get_or_insert_with(|| {
                        BrewOpsError::Internal(format!("Sync manager task panicked: {e}"))
                    });
                }
                Err(_) => {
                    warn!("Sync manager task did not complete within timeout");
                    first_error.get_or_insert_with(|| {
                        BrewOpsError::Internal(format!(
                            "Sync manager task did not stop within {join_timeout:?}"
                        ))
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("Sync manager stopped");
                Ok(())
            }
        }
    }

    /// Whether the background tasks are alive.
    pub async fn is_running(&self) -> bool {
        let handles = self.task_handles.lock().await;
        handles.iter().any(|handle| !handle.is_finished())
    }

    async fn drain_loop(core: Arc<SyncCore>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(core.config.drain_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync manager drain loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = core.drain_once().await;
                    debug!(?outcome, "Periodic drain finished");
                }
            }
        }
    }

    async fn connectivity_loop(
        core: Arc<SyncCore>,
        mut transitions: tokio::sync::broadcast::Receiver<Connectivity>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync manager connectivity loop cancelled");
                    break;
                }
                event = transitions.recv() => match event {
                    Ok(Connectivity::Online) => {
                        info!("Connectivity restored; draining outbox");
                        let outcome = core.drain_after_reconnect().await;
                        debug!(?outcome, "Reconnect drain finished");
                    }
                    Ok(Connectivity::Offline) => {
                        debug!("Connectivity lost; pausing drains");
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Connectivity events lagged");
                        if core.monitor.is_online() {
                            core.drain_after_reconnect().await;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Connectivity channel closed");
                        break;
                    }
                },
            }
        }
    }
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("config", &self.core.config)
            .field("draining", &self.is_draining())
            .finish_non_exhaustive()
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        let running = self
            .task_handles
            .try_lock()
            .map(|handles| handles.iter().any(|handle| !handle.is_finished()))
            .unwrap_or(true);
        if running {
            warn!("SyncManager dropped while running; cancelling tasks");
            self.cancellation_token.lock().cancel();
        }
    }
}

fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= MAX_ERROR_LENGTH {
        return reason.to_string();
    }

    let mut truncated = reason.chars().take(MAX_ERROR_LENGTH.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}
