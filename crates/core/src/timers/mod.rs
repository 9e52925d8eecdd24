//! Batch timer countdowns

pub mod service;

pub use service::TimerService;
