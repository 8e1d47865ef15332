//! Errors of facade construction and management operations.
//!
//! The request path does not use these: verification returns a
//! [`RejectReason`](warden_core::RejectReason) and authorization an
//! [`AccessDecision`](crate::AccessDecision).

use thiserror::Error;

/// Errors that can occur building or managing a [`Warden`](crate::Warden).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Configuration could not be turned into components.
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A token operation failed.
    #[error(transparent)]
    Token(#[from] warden_token::TokenError),

    /// A revocation tier failed.
    #[error(transparent)]
    Revocation(#[from] warden_revocation::RevocationError),

    /// An audit sink could not be built.
    #[error(transparent)]
    Audit(#[from] warden_audit::AuditError),
}

impl AuthError {
    pub(crate) fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<warden_config::ConfigError> for AuthError {
    fn from(err: warden_config::ConfigError) -> Self {
        match err {
            warden_config::ConfigError::ValidationError { field, message } => {
                Self::InvalidConfig { field, message }
            },
            other => Self::invalid_config("config", other.to_string()),
        }
    }
}

/// Result type for facade operations.
pub type AuthResult<T> = Result<T, AuthError>;
