//! Audit event types.
//!
//! Every verification outcome, every authorization decision, every
//! revocation and every revocation-tier degradation is recorded as an
//! [`AuditEvent`]. Events carry identifiers and reason codes only; raw
//! tokens and secrets never appear in them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{DenyReason, RejectReason, RequestMeta, Timestamp, TokenKey};

/// Unique identifier of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEventId(pub Uuid);

impl AuditEventId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How urgently an event needs a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine outcome.
    Info,
    /// A client was refused or a tier degraded.
    Warning,
    /// Our own infrastructure failed closed. Page someone.
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Alert => "alert",
        };
        f.write_str(s)
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditKind {
    /// A token was accepted.
    VerificationSuccess {
        /// The accepted subject.
        subject: String,
        /// Trusted source whose profile matched.
        source: String,
    },
    /// A token was rejected.
    VerificationFailure {
        /// Why.
        reason: RejectReason,
    },
    /// An authorization check allowed access.
    AuthorizationGranted {
        /// Acting subject.
        subject: String,
        /// Resource identifier.
        resource: String,
        /// Which rule allowed it (`role`, `owner` or `delegate`).
        basis: String,
    },
    /// An authorization check denied access.
    AuthorizationDenied {
        /// Acting subject.
        subject: String,
        /// Resource identifier.
        resource: String,
        /// Why.
        reason: DenyReason,
    },
    /// A token was revoked.
    TokenRevoked {
        /// Revocation key of the token.
        key: TokenKey,
        /// When the revocation record may be dropped.
        expires_at: Timestamp,
    },
    /// The cache tier failed and the store answered instead.
    CacheDegraded {
        /// Cache operation that failed (`lookup`, `mirror`, `resync`).
        operation: String,
        /// Error text.
        detail: String,
    },
    /// The authoritative store could not be reached.
    StoreUnavailable {
        /// Store operation that failed (`contains`, `insert`, `purge`).
        operation: String,
        /// Error text.
        detail: String,
    },
}

impl AuditKind {
    /// Short machine-readable name of the kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerificationSuccess { .. } => "verification_success",
            Self::VerificationFailure { .. } => "verification_failure",
            Self::AuthorizationGranted { .. } => "authorization_granted",
            Self::AuthorizationDenied { .. } => "authorization_denied",
            Self::TokenRevoked { .. } => "token_revoked",
            Self::CacheDegraded { .. } => "cache_degraded",
            Self::StoreUnavailable { .. } => "store_unavailable",
        }
    }

    /// Severity of this kind of event.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::VerificationSuccess { .. }
            | Self::AuthorizationGranted { .. }
            | Self::TokenRevoked { .. } => Severity::Info,
            Self::VerificationFailure { reason } if reason.is_infrastructure() => Severity::Alert,
            Self::VerificationFailure { .. }
            | Self::AuthorizationDenied { .. }
            | Self::CacheDegraded { .. } => Severity::Warning,
            Self::StoreUnavailable { .. } => Severity::Alert,
        }
    }

    /// Human-readable one-liner.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::VerificationSuccess { subject, source } => {
                format!("Accepted token for {subject} from {source}")
            },
            Self::VerificationFailure { reason } => {
                format!("Rejected token ({reason})")
            },
            Self::AuthorizationGranted {
                subject,
                resource,
                basis,
            } => {
                format!("Granted {subject} access to {resource} ({basis})")
            },
            Self::AuthorizationDenied {
                subject,
                resource,
                reason,
            } => {
                format!("Denied {subject} access to {resource} ({reason})")
            },
            Self::TokenRevoked { key, expires_at } => {
                format!("Revoked {key} until {expires_at}")
            },
            Self::CacheDegraded { operation, detail } => {
                format!("Revocation cache {operation} failed: {detail}")
            },
            Self::StoreUnavailable { operation, detail } => {
                format!("Revocation store {operation} failed: {detail}")
            },
        }
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub id: AuditEventId,
    /// When the event was recorded.
    pub timestamp: Timestamp,
    /// Request context supplied by the transport, if any.
    pub request: Option<RequestMeta>,
    /// What happened.
    pub kind: AuditKind,
}

impl AuditEvent {
    /// Create an event stamped with the given time.
    #[must_use]
    pub fn new(kind: AuditKind, timestamp: Timestamp) -> Self {
        Self {
            id: AuditEventId::new(),
            timestamp,
            request: None,
            kind,
        }
    }

    /// Attach request context.
    #[must_use]
    pub fn with_request(mut self, meta: Option<&RequestMeta>) -> Self {
        self.request = meta.cloned();
        self
    }

    /// Severity of the event.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Human-readable one-liner.
    #[must_use]
    pub fn description(&self) -> String {
        self.kind.description()
    }
}
