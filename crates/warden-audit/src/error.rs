//! Audit-related error types.

use thiserror::Error;

/// Errors raised inside audit sinks.
///
/// Sinks never return these to the request path; they are logged and
/// surfaced only by inspection APIs such as [`KvAuditSink::events`](crate::KvAuditSink::events).
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<warden_storage::StorageError> for AuditError {
    fn from(err: warden_storage::StorageError) -> Self {
        match err {
            warden_storage::StorageError::Serialization(msg) => Self::SerializationError(msg),
            other => Self::StorageError(other.to_string()),
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
