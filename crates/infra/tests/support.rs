use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use brewops_core::{
    Clock, DispatchOutcome, MockClock, NetworkMonitor, OperationDispatcher, OperationHandler,
    SyncError,
};
use brewops_domain::{
    Connectivity, DatabaseConfig, FermentationReading, NewOperation, OperationPayload,
    OperationScope,
};
use brewops_infra::database::LocalStore;
use brewops_infra::network::ConnectivityMonitor;
use brewops_infra::sync::{SyncManager, SyncManagerConfig};
use tempfile::TempDir;

/// Fixed start instant for deterministic clocks (2023-11-14T22:13:20Z)
pub const T0: i64 = 1_700_000_000_000;

/// Install a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Temporary local store that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub store: Arc<LocalStore>,
    pub clock: MockClock,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        init_tracing();
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let config = DatabaseConfig {
            path: temp_dir.path().join("brewops-test.db").to_string_lossy().into_owned(),
            pool_size: 4,
        };
        let clock = MockClock::new(T0);
        let store =
            LocalStore::open(&config, Arc::new(clock.clone())).expect("local store should open");

        Self { store: Arc::new(store), clock, _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// A sync manager wired to a temporary store, a manual monitor and a mock
/// clock.
pub struct TestHarness {
    pub db: TestDatabase,
    pub monitor: Arc<ConnectivityMonitor>,
    pub dispatcher: Arc<OperationDispatcher>,
    pub manager: Arc<SyncManager>,
}

impl TestHarness {
    pub fn new(initial: Connectivity) -> Self {
        Self::with_config(initial, SyncManagerConfig::default())
    }

    pub fn with_config(initial: Connectivity, config: SyncManagerConfig) -> Self {
        let db = TestDatabase::new();
        let monitor = Arc::new(ConnectivityMonitor::new(initial));
        let dispatcher = Arc::new(OperationDispatcher::new());
        let manager = Arc::new(SyncManager::new(
            db.store.outbox(),
            Arc::clone(&dispatcher),
            Arc::clone(&monitor) as Arc<dyn NetworkMonitor>,
            Arc::new(db.clock.clone()) as Arc<dyn Clock>,
            config,
        ));

        Self { db, monitor, dispatcher, manager }
    }

    pub fn online() -> Self {
        Self::new(Connectivity::Online)
    }

    pub fn advance(&self, by: Duration) {
        self.db.clock.advance(by);
    }
}

pub fn scope() -> OperationScope {
    OperationScope::new("brewery-1", "brewer-1")
}

pub fn reading(batch_id: &str) -> NewOperation {
    NewOperation::new(
        FermentationReading {
            batch_id: batch_id.to_string(),
            gravity: 1.048,
            temperature_c: 19.0,
            ph: None,
            recorded_at: T0,
            notes: None,
        },
        scope(),
    )
}

/// One recorded dispatch
#[derive(Debug, Clone)]
pub struct DispatchCall<P> {
    pub payload: P,
    pub idempotency_key: String,
    pub scope: OperationScope,
}

type Script = Mutex<VecDeque<Result<DispatchOutcome, SyncError>>>;
type CallLog<P> = Mutex<Vec<DispatchCall<P>>>;

/// Handler that replays scripted results and records every call.
///
/// Once the script runs out every call succeeds.
pub struct ScriptedHandler<P> {
    script: Arc<Script>,
    calls: Arc<CallLog<P>>,
    _payload: PhantomData<fn(P)>,
}

/// Read side of a [`ScriptedHandler`] kept by the test after registration
pub struct ScriptedCalls<P> {
    calls: Arc<CallLog<P>>,
}

impl<P: OperationPayload + Clone> ScriptedHandler<P> {
    pub fn new(
        script: impl IntoIterator<Item = Result<DispatchOutcome, SyncError>>,
    ) -> (Self, ScriptedCalls<P>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            calls: Arc::clone(&calls),
            _payload: PhantomData,
        };
        (handler, ScriptedCalls { calls })
    }

    pub fn always_ok() -> (Self, ScriptedCalls<P>) {
        Self::new([])
    }
}

impl<P: Clone> ScriptedCalls<P> {
    pub fn count(&self) -> usize {
        self.calls.lock().expect("call log poisoned").len()
    }

    pub fn calls(&self) -> Vec<DispatchCall<P>> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.idempotency_key).collect()
    }
}

#[async_trait]
impl<P: OperationPayload + Clone> OperationHandler for ScriptedHandler<P> {
    type Payload = P;

    async fn apply(
        &self,
        payload: P,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> Result<DispatchOutcome, SyncError> {
        self.calls.lock().expect("call log poisoned").push(DispatchCall {
            payload,
            idempotency_key: idempotency_key.to_string(),
            scope: scope.clone(),
        });
        self.script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(Ok(DispatchOutcome::Applied))
    }
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
