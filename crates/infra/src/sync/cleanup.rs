//! Data cleanup service for the local store
//!
//! Periodically garbage collects outbox items, completed timers and expired
//! cache entries older than the retention horizon. Follows the same lifecycle
//! as the other background services: tracked join handle, explicit
//! cancellation and a bounded wait on stop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use brewops_domain::{BrewOpsError, Config, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::database::{GcReport, LocalStore};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for cleanup service
#[derive(Debug, Clone)]
pub struct CleanupServiceConfig {
    /// Data older than this is deleted
    pub retention: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CleanupServiceConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CleanupServiceConfig {
    fn from(config: &Config) -> Self {
        Self { retention: config.outbox.retention(), cleanup_interval: config.cleanup.interval() }
    }
}

/// Statistics from cleanup operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupStats {
    pub removed: GcReport,
    pub duration_secs: f64,
}

/// Background cleanup service with lifecycle management
pub struct CleanupService {
    store: Arc<LocalStore>,
    config: CleanupServiceConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl CleanupService {
    pub fn new(store: Arc<LocalStore>, config: CleanupServiceConfig) -> Self {
        Self {
            store,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the cleanup service
    ///
    /// Spawns a background task that runs cleanup periodically.
    ///
    /// # Errors
    ///
    /// Returns error if service is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running().await {
            return Err(BrewOpsError::Internal("Cleanup service already running".into()));
        }

        info!("Starting cleanup service");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::cleanup_loop(store, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Cleanup service started");

        Ok(())
    }

    /// Stop the cleanup service gracefully
    ///
    /// # Errors
    ///
    /// Returns error if service is not running or does not stop in time
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running().await {
            return Err(BrewOpsError::Internal("Cleanup service not running".into()));
        }

        info!("Stopping cleanup service");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Cleanup task panicked: {}", e);
                    return Err(BrewOpsError::Internal(format!("Cleanup task panicked: {e}")));
                }
                Err(_) => {
                    warn!("Cleanup task did not complete within timeout");
                    return Err(BrewOpsError::Internal(format!(
                        "Cleanup task did not stop within {JOIN_TIMEOUT:?}"
                    )));
                }
            }
        }

        info!("Cleanup service stopped");

        Ok(())
    }

    /// A service is running while it has an unfinished task handle.
    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run cleanup once immediately
    ///
    /// # Errors
    ///
    /// Returns error if a collection cannot be cleaned
    #[instrument(skip(self))]
    pub async fn cleanup_once(&self) -> Result<CleanupStats> {
        run_cleanup(&self.store, self.config.retention).await
    }

    async fn cleanup_loop(
        store: Arc<LocalStore>,
        config: CleanupServiceConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cleanup loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.cleanup_interval) => {
                    match run_cleanup(&store, config.retention).await {
                        Ok(stats) => {
                            debug!(
                                removed = stats.removed.total(),
                                duration_secs = stats.duration_secs,
                                "Periodic cleanup completed"
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "Periodic cleanup failed");
                        }
                    }
                }
            }
        }
    }
}

async fn run_cleanup(store: &LocalStore, retention: Duration) -> Result<CleanupStats> {
    let start = Instant::now();
    let removed = store.garbage_collect(retention).await?;
    Ok(CleanupStats { removed, duration_secs: start.elapsed().as_secs_f64() })
}

/// Ensure service is stopped when dropped
impl Drop for CleanupService {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            debug!("CleanupService dropped; cancelling token");
            self.cancellation_token.cancel();
        }
    }
}
