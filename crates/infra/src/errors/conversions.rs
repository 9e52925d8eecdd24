//! Conversions from external infrastructure errors into domain errors.

use brewops_common::storage::StorageError;
use brewops_domain::BrewOpsError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BrewOpsError);

impl From<InfraError> for BrewOpsError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BrewOpsError> for InfraError {
    fn from(value: BrewOpsError) -> Self {
        Self(value)
    }
}

trait IntoBrewOpsError {
    fn into_brewops(self) -> BrewOpsError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BrewOpsError */
/* -------------------------------------------------------------------------- */

impl IntoBrewOpsError for SqlError {
    fn into_brewops(self) -> BrewOpsError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        BrewOpsError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        BrewOpsError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        BrewOpsError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::DiskFull, _) => BrewOpsError::Database("disk is full".into()),
                    (ErrorCode::ReadOnly, _) => {
                        BrewOpsError::Database("database is read-only".into())
                    }
                    _ => BrewOpsError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => BrewOpsError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                BrewOpsError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                BrewOpsError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => BrewOpsError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => BrewOpsError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_brewops())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → BrewOpsError */
/* -------------------------------------------------------------------------- */

impl IntoBrewOpsError for StorageError {
    fn into_brewops(self) -> BrewOpsError {
        match self {
            StorageError::Rusqlite(sql_err) => sql_err.into_brewops(),
            StorageError::SerdeJson(json_err) => BrewOpsError::Serialization(json_err.to_string()),
            StorageError::InvalidConfig(message) => BrewOpsError::Config(message),
            other => BrewOpsError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        Self(value.into_brewops())
    }
}

/* -------------------------------------------------------------------------- */
/* JoinError → BrewOpsError */
/* -------------------------------------------------------------------------- */

impl IntoBrewOpsError for JoinError {
    fn into_brewops(self) -> BrewOpsError {
        if self.is_cancelled() {
            BrewOpsError::Internal("blocking database task was cancelled".into())
        } else {
            BrewOpsError::Internal(format!("blocking database task panicked: {self}"))
        }
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        Self(value.into_brewops())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BrewOpsError */
/* -------------------------------------------------------------------------- */

impl IntoBrewOpsError for HttpError {
    // Request-time failures are classified by the handler itself; only client
    // and request construction errors reach this conversion.
    fn into_brewops(self) -> BrewOpsError {
        if self.is_builder() {
            BrewOpsError::Config(format!("invalid HTTP client settings: {self}"))
        } else {
            BrewOpsError::Network(self.to_string())
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_brewops())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
