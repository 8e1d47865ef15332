//! Claim sets: issue requests, parsed (signature-checked) claims and
//! validated tokens.

use std::time::Duration;

use serde_json::{Map, Value};
use warden_core::{Role, Timestamp, TokenKey};

/// Subject claim.
pub const CLAIM_SUB: &str = "sub";
/// Issued-at claim (Unix seconds).
pub const CLAIM_IAT: &str = "iat";
/// Expiry claim (Unix seconds).
pub const CLAIM_EXP: &str = "exp";
/// Issuer claim.
pub const CLAIM_ISS: &str = "iss";
/// Audience claim.
pub const CLAIM_AUD: &str = "aud";
/// Optional role claim.
pub const CLAIM_ROLE: &str = "role";

/// Claims the codec always writes itself. Caller-supplied values for these
/// keys are overwritten.
pub const PROTECTED_CLAIMS: [&str; 5] = [CLAIM_SUB, CLAIM_IAT, CLAIM_EXP, CLAIM_ISS, CLAIM_AUD];

/// What to put in a new token.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRequest {
    /// Principal identifier.
    pub subject: String,
    /// Issuing service.
    pub issuer: String,
    /// Intended consuming service.
    pub audience: String,
    /// Lifetime; whole seconds, at least one.
    pub ttl: Duration,
    /// Optional role.
    pub role: Option<Role>,
    /// Service-specific claims, applied before the protected ones.
    pub extra_claims: Map<String, Value>,
}

impl IssueRequest {
    /// Create a request with no role and no extra claims.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
            role: None,
            extra_claims: Map::new(),
        }
    }

    /// Set the role claim.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<Role>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Add one extra claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_claims.insert(name.into(), value.into());
        self
    }

    /// Add several extra claims.
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.extra_claims.extend(claims);
        self
    }
}

/// A freshly issued token.
#[derive(Clone)]
pub struct IssuedToken {
    /// The compact `header.payload.signature` string.
    pub token: String,
    /// Revocation lookup key for this token.
    pub key: TokenKey,
    /// `iat`.
    pub issued_at: Timestamp,
    /// `exp`.
    pub expires_at: Timestamp,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("key", &self.key)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Claims of a token whose signature has been verified but whose claims
/// have not been checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToken {
    claims: Map<String, Value>,
}

impl ParsedToken {
    pub(crate) fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// A single claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// All claims.
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub(crate) fn into_claims(self) -> Map<String, Value> {
        self.claims
    }
}

/// A token whose signature and claims have both been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// `sub`.
    pub subject: String,
    /// `iss`.
    pub issuer: String,
    /// `aud`.
    pub audience: String,
    /// `iat`.
    pub issued_at: Timestamp,
    /// `exp`.
    pub expires_at: Timestamp,
    /// `role`, when present as a string.
    pub role: Option<Role>,
    /// Every claim, protected ones included.
    pub claims: Map<String, Value>,
}

impl Token {
    /// Look up a service-specific claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}
