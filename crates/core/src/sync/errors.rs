//! Dispatch error taxonomy
//!
//! Handlers report failures as [`SyncError`]; the drain only looks at the
//! [`FailureClass`] to decide between retry, removal and terminal marking.

use brewops_domain::BrewOpsError;
use thiserror::Error;

/// How the drain treats a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retried under backoff
    Transient,
    /// Remote already applied this idempotency key; treated as success
    Duplicate,
    /// Never retried; marked terminal on first attempt
    Permanent,
    /// Local and remote versions disagree; marked terminal for review
    Conflict,
}

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Already applied: {0}")]
    Duplicate(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("No handler registered for {0}")]
    NoHandler(String),

    #[error("Version conflict: local version {local_version}, remote version {remote_version}")]
    Conflict { local_version: u64, remote_version: u64 },
}

impl SyncError {
    pub const fn category(&self) -> FailureClass {
        match self {
            Self::Network(_)
            | Self::Server(_)
            | Self::Timeout(_)
            | Self::RateLimit(_)
            | Self::Unavailable(_) => FailureClass::Transient,
            Self::Duplicate(_) => FailureClass::Duplicate,
            Self::Rejected(_)
            | Self::InvalidPayload(_)
            | Self::UnknownOperation(_)
            | Self::NoHandler(_) => FailureClass::Permanent,
            Self::Conflict { .. } => FailureClass::Conflict,
        }
    }
}

/// Local failures a handler hits before reaching the remote side
impl From<BrewOpsError> for SyncError {
    fn from(err: BrewOpsError) -> Self {
        match err {
            BrewOpsError::Network(message) => Self::Network(message),
            BrewOpsError::Database(message) | BrewOpsError::Internal(message) => {
                Self::Unavailable(message)
            }
            BrewOpsError::Serialization(message) => Self::InvalidPayload(message),
            BrewOpsError::NotFound(message)
            | BrewOpsError::InvalidInput(message)
            | BrewOpsError::Config(message) => Self::Rejected(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SyncError::Server("502".into()).category(), FailureClass::Transient);
        assert_eq!(
            SyncError::Timeout(std::time::Duration::from_secs(3)).category(),
            FailureClass::Transient
        );
        assert_eq!(SyncError::Duplicate("key".into()).category(), FailureClass::Duplicate);
        assert_eq!(SyncError::NoHandler("x".into()).category(), FailureClass::Permanent);
        assert_eq!(
            SyncError::Conflict { local_version: 3, remote_version: 4 }.category(),
            FailureClass::Conflict
        );
    }

    #[test]
    fn test_transport_failures_are_transient() {
        assert_eq!(SyncError::Network("reset".into()).category(), FailureClass::Transient);
        assert_eq!(SyncError::RateLimit("429".into()).category(), FailureClass::Transient);
        assert_eq!(SyncError::Rejected("bad gravity".into()).category(), FailureClass::Permanent);
    }

    #[test]
    fn conflict_message_names_both_versions() {
        let message = SyncError::Conflict { local_version: 7, remote_version: 9 }.to_string();
        assert!(message.contains("local version 7"));
        assert!(message.contains("remote version 9"));
    }

    #[test]
    fn domain_errors_map_onto_dispatch_classes() {
        assert_eq!(
            SyncError::from(BrewOpsError::Network("dns".into())).category(),
            FailureClass::Transient
        );
        assert_eq!(
            SyncError::from(BrewOpsError::Serialization("eof".into())).category(),
            FailureClass::Permanent
        );
    }
}
