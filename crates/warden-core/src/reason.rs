//! Rejection and denial taxonomy.
//!
//! These are the only outcomes the request path reports. Each variant maps
//! deterministically to a transport status; the reason code itself is for
//! logs and audit only and is never echoed to clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// The token is not a well-formed three-part signed structure.
    #[error("malformed")]
    Malformed,
    /// The signature does not verify under any trusted key, or the header
    /// names an algorithm other than the pinned one.
    #[error("bad-signature")]
    BadSignature,
    /// `exp` is not strictly in the future.
    #[error("expired")]
    Expired,
    /// One of `sub`, `iat`, `exp`, `iss`, `aud` is absent or mistyped.
    #[error("missing-claim")]
    MissingClaim,
    /// `iss` does not match the trusted source.
    #[error("wrong-issuer")]
    WrongIssuer,
    /// `aud` does not match the trusted source.
    #[error("wrong-audience")]
    WrongAudience,
    /// The token was explicitly revoked.
    #[error("revoked")]
    Revoked,
    /// Revocation status could not be established; the token is rejected
    /// because absence of revocation cannot be proven.
    #[error("store-unavailable")]
    StoreUnavailable,
}

impl RejectReason {
    /// Stable reason code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::BadSignature => "bad-signature",
            Self::Expired => "expired",
            Self::MissingClaim => "missing-claim",
            Self::WrongIssuer => "wrong-issuer",
            Self::WrongAudience => "wrong-audience",
            Self::Revoked => "revoked",
            Self::StoreUnavailable => "store-unavailable",
        }
    }

    /// True when the rejection stems from our infrastructure rather than
    /// from the presented token. Operators alert on these.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

/// Why an authorization check denied access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    /// No role shortcut, ownership or delegation applied.
    #[error("not-authorized")]
    NotAuthorized,
}

impl DenyReason {
    /// Stable reason code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "not-authorized",
        }
    }
}
