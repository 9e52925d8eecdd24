//! Database implementations

pub mod cache_repository;
pub mod local_store;
pub mod manager;
pub mod outbox_repository;
pub mod session_state_repository;
pub mod timer_repository;

pub use cache_repository::SqliteCacheRepository;
pub use local_store::{GcReport, LocalStore};
pub use manager::DbManager;
pub use outbox_repository::SqliteOutboxRepository;
pub use session_state_repository::SqliteSessionStateRepository;
pub use timer_repository::SqliteTimerRepository;
