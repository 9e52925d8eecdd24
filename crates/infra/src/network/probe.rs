//! TCP reachability probe
//!
//! Periodically opens a TCP connection to a configured `host:port` and feeds
//! the result into a [`ConnectivityMonitor`]. A connect that completes within
//! the timeout counts as online; anything else counts as offline.

use std::sync::Arc;
use std::time::Duration;

use brewops_domain::{BrewOpsError, NetworkConfig, Result};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::monitor::ConnectivityMonitor;

type TaskHandle = Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TcpReachabilityProbe {
    monitor: Arc<ConnectivityMonitor>,
    addr: String,
    interval: Duration,
    timeout: Duration,
    cancellation_token: Mutex<CancellationToken>,
    task_handle: TaskHandle,
}

impl TcpReachabilityProbe {
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        addr: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            monitor,
            addr: addr.into(),
            interval,
            timeout,
            cancellation_token: Mutex::new(CancellationToken::new()),
            task_handle: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Build a probe when `probe_addr` is configured.
    pub fn from_config(config: &NetworkConfig, monitor: Arc<ConnectivityMonitor>) -> Option<Self> {
        config.probe_addr.as_ref().map(|addr| {
            Self::new(
                monitor,
                addr.clone(),
                Duration::from_millis(config.probe_interval_ms),
                Duration::from_millis(config.probe_timeout_ms),
            )
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Probe once and report the sample to the monitor.
    pub async fn probe_once(&self) -> bool {
        let online = probe(&self.addr, self.timeout).await;
        self.monitor.set_online(online);
        online
    }

    /// Spawn the probing loop; the first sample is taken immediately.
    ///
    /// # Errors
    /// Returns an error if the probe is already running.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn start(&self) -> Result<()> {
        let mut handle_slot = self.task_handle.lock().await;
        if handle_slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(BrewOpsError::Internal("Reachability probe already running".into()));
        }

        let cancel = CancellationToken::new();
        *self.cancellation_token.lock() = cancel.clone();

        let monitor = Arc::clone(&self.monitor);
        let addr = self.addr.clone();
        let interval = self.interval;
        let timeout = self.timeout;

        *handle_slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Reachability probe loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let online = probe(&addr, timeout).await;
                        monitor.set_online(online);
                    }
                }
            }
        }));

        info!("Reachability probe started");
        Ok(())
    }

    /// Cancel the probing loop and wait for it to finish.
    ///
    /// # Errors
    /// Returns an error if the probe is not running or does not stop in time.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn stop(&self) -> Result<()> {
        let Some(handle) = self.task_handle.lock().await.take() else {
            return Err(BrewOpsError::Internal("Reachability probe not running".into()));
        };

        self.cancellation_token.lock().cancel();

        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Reachability probe task panicked: {}", e);
                return Err(BrewOpsError::Internal(format!("Probe task panicked: {e}")));
            }
            Err(_) => {
                warn!("Reachability probe did not stop within timeout");
                return Err(BrewOpsError::Internal("Probe task did not stop in time".into()));
            }
        }

        info!("Reachability probe stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TcpReachabilityProbe {
    fn drop(&mut self) {
        let running = self
            .task_handle
            .try_lock()
            .map(|guard| guard.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(true);
        if running {
            warn!("TcpReachabilityProbe dropped while running; cancelling task");
            self.cancellation_token.lock().cancel();
        }
    }
}

async fn probe(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            debug!(addr, error = %err, "Reachability probe failed");
            false
        }
        Err(_) => {
            debug!(addr, ?timeout, "Reachability probe timed out");
            false
        }
    }
}
