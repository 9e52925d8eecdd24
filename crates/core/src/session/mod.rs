//! Per-batch session state

pub mod service;

pub use service::SessionStateService;
