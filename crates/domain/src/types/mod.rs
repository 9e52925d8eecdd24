//! Domain types and models

pub mod cache;
pub mod connectivity;
pub mod operation;
pub mod outbox;
pub mod session;
pub mod timer;

pub use cache::CacheEntry;
pub use connectivity::Connectivity;
pub use operation::{
    BatchStatusTransition, FermentationReading, InventoryConsumption, Operation, OperationKind,
    OperationPayload, YeastEvent, YeastLifecycleEvent,
};
pub use outbox::{NewOperation, OperationScope, OutboxItem, OutboxItemUpdate, OutboxStatus};
pub use session::SessionState;
pub use timer::Timer;
