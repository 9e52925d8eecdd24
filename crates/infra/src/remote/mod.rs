//! Remote system of record adapters

pub mod http_handler;

pub use http_handler::{HttpHandlerConfig, HttpOperationHandler, IDEMPOTENCY_KEY_HEADER};
