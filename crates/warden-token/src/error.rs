//! Token codec error types.

use thiserror::Error;
use warden_core::RejectReason;

/// Errors from issuing, parsing or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not a well-formed three-part signed structure.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not verify under this key.
    #[error("signature verification failed")]
    BadSignature,

    /// The header names an algorithm other than the pinned one.
    #[error("token algorithm does not match the pinned algorithm")]
    AlgorithmMismatch,

    /// `exp` is not strictly in the future.
    #[error("token expired")]
    Expired,

    /// A required claim is absent or has the wrong JSON type.
    #[error("missing or mistyped claim: {0}")]
    MissingClaim(&'static str),

    /// `iss` does not match the expected issuer.
    #[error("issuer mismatch")]
    WrongIssuer,

    /// `aud` does not match the expected audience.
    #[error("audience mismatch")]
    WrongAudience,

    /// The signing key is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The issue request is invalid (e.g. zero TTL).
    #[error("invalid issue request: {0}")]
    InvalidRequest(String),

    /// Encoding the token failed.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    /// The rejection reason for errors raised while reading a token.
    ///
    /// Returns `None` for issuance-side errors.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Malformed(_) => Some(RejectReason::Malformed),
            Self::BadSignature | Self::AlgorithmMismatch => Some(RejectReason::BadSignature),
            Self::Expired => Some(RejectReason::Expired),
            Self::MissingClaim(_) => Some(RejectReason::MissingClaim),
            Self::WrongIssuer => Some(RejectReason::WrongIssuer),
            Self::WrongAudience => Some(RejectReason::WrongAudience),
            Self::InvalidKey(_) | Self::InvalidRequest(_) | Self::Encoding(_) => None,
        }
    }

    /// Whether the error happened before the signature was proven.
    #[must_use]
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, Self::BadSignature | Self::AlgorithmMismatch)
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => Self::AlgorithmMismatch,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
