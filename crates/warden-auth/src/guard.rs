//! Per-resource authorization.
//!
//! The guard knows nothing about any resource type. Each owning service
//! supplies an ownership predicate and, optionally, a delegate predicate;
//! the guard applies them in a fixed order and audits every denial.
//!
//! Existence checks happen before the guard is called. The guard never
//! distinguishes "not found" from "not authorized"; the caller picks one
//! [`DenialStatus`](crate::DenialStatus) per resource class.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use warden_audit::{AuditEvent, AuditKind, AuditSink};
use warden_core::{DenyReason, Principal, RequestMeta, Role, Timestamp};

/// Anything the guard can be asked about.
pub trait GuardedResource {
    /// Identifier recorded in audit events, e.g. `document:7`.
    fn resource_id(&self) -> String;
}

type DelegatePredicate<R> = Arc<dyn Fn(&R, &Principal) -> bool + Send + Sync>;

/// Per-endpoint access policy.
pub struct AccessOptions<R> {
    allow_roles: HashSet<Role>,
    delegate: Option<DelegatePredicate<R>>,
}

impl<R> AccessOptions<R> {
    /// Owner-only policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_roles: HashSet::new(),
            delegate: None,
        }
    }

    /// Let a role bypass ownership entirely.
    #[must_use]
    pub fn allow_role(mut self, role: impl Into<Role>) -> Self {
        self.allow_roles.insert(role.into());
        self
    }

    /// Allow principals for whom `predicate` holds, after the ownership
    /// check fails. E.g. an educator assigned to the resource's child.
    #[must_use]
    pub fn allow_delegates(
        mut self,
        predicate: impl Fn(&R, &Principal) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.delegate = Some(Arc::new(predicate));
        self
    }

    /// Whether `role` bypasses ownership.
    #[must_use]
    pub fn is_allowed_role(&self, role: &Role) -> bool {
        self.allow_roles.contains(role)
    }

    /// Whether a delegate predicate is configured.
    #[must_use]
    pub fn delegates_enabled(&self) -> bool {
        self.delegate.is_some()
    }
}

impl<R> Default for AccessOptions<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for AccessOptions<R> {
    fn clone(&self) -> Self {
        Self {
            allow_roles: self.allow_roles.clone(),
            delegate: self.delegate.clone(),
        }
    }
}

impl<R> fmt::Debug for AccessOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessOptions")
            .field("allow_roles", &self.allow_roles)
            .field("delegates", &self.delegate.is_some())
            .finish()
    }
}

/// Which rule allowed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowBasis {
    /// The principal's role is in the allow-list.
    Role,
    /// The ownership predicate held.
    Owner,
    /// The delegate predicate held.
    Delegate,
}

impl AllowBasis {
    /// Stable code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Owner => "owner",
            Self::Delegate => "delegate",
        }
    }
}

impl fmt::Display for AllowBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessDecision {
    /// Access granted.
    Allow(AllowBasis),
    /// Access refused.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Whether access was granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] for a `Deny`.
    pub fn into_result(self) -> Result<AllowBasis, AccessDenied> {
        match self {
            Self::Allow(basis) => Ok(basis),
            Self::Deny(reason) => Err(AccessDenied::new(reason)),
        }
    }
}

/// A denial as handed to the transport layer.
///
/// Its `Display` is deliberately generic: it never names the resource, its
/// owner or any other principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("access denied")]
pub struct AccessDenied {
    reason: DenyReason,
}

impl AccessDenied {
    /// Wrap a reason.
    #[must_use]
    pub fn new(reason: DenyReason) -> Self {
        Self { reason }
    }

    /// Internal reason, for logs only.
    #[must_use]
    pub fn reason(&self) -> DenyReason {
        self.reason
    }
}

/// Applies access policies and audits the outcome.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    audit: Arc<dyn AuditSink>,
    record_grants: bool,
}

impl AuthorizationGuard {
    /// Create a guard that audits denials and grants.
    #[must_use]
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            audit,
            record_grants: true,
        }
    }

    /// Whether grants are audited. Denials always are.
    #[must_use]
    pub fn with_grant_auditing(mut self, enabled: bool) -> Self {
        self.record_grants = enabled;
        self
    }

    /// Decide whether `principal` may act on `resource`.
    ///
    /// Order: allow-listed role, then `owns(resource, subject)`, then the
    /// delegate predicate, then deny.
    pub async fn authorize<R, F>(
        &self,
        principal: &Principal,
        resource: &R,
        owns: F,
        options: &AccessOptions<R>,
        meta: Option<&RequestMeta>,
    ) -> AccessDecision
    where
        R: GuardedResource,
        F: FnOnce(&R, &str) -> bool,
    {
        let decision = Self::decide(principal, resource, owns, options);
        let resource_id = resource.resource_id();

        let kind = match decision {
            AccessDecision::Allow(basis) => {
                debug!(subject = %principal.subject, resource = %resource_id, basis = %basis, "Access granted");
                if !self.record_grants {
                    return decision;
                }
                AuditKind::AuthorizationGranted {
                    subject: principal.subject.clone(),
                    resource: resource_id,
                    basis: basis.as_str().to_owned(),
                }
            },
            AccessDecision::Deny(reason) => {
                info!(subject = %principal.subject, resource = %resource_id, reason = %reason, "Access denied");
                AuditKind::AuthorizationDenied {
                    subject: principal.subject.clone(),
                    resource: resource_id,
                    reason,
                }
            },
        };

        self.audit
            .record(AuditEvent::new(kind, Timestamp::now()).with_request(meta))
            .await;
        decision
    }

    /// [`authorize`](Self::authorize) as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] when access is refused.
    pub async fn require<R, F>(
        &self,
        principal: &Principal,
        resource: &R,
        owns: F,
        options: &AccessOptions<R>,
        meta: Option<&RequestMeta>,
    ) -> Result<AllowBasis, AccessDenied>
    where
        R: GuardedResource,
        F: FnOnce(&R, &str) -> bool,
    {
        self.authorize(principal, resource, owns, options, meta)
            .await
            .into_result()
    }

    fn decide<R, F>(
        principal: &Principal,
        resource: &R,
        owns: F,
        options: &AccessOptions<R>,
    ) -> AccessDecision
    where
        F: FnOnce(&R, &str) -> bool,
    {
        if principal
            .role
            .as_ref()
            .is_some_and(|role| options.is_allowed_role(role))
        {
            return AccessDecision::Allow(AllowBasis::Role);
        }
        if owns(resource, &principal.subject) {
            return AccessDecision::Allow(AllowBasis::Owner);
        }
        if options
            .delegate
            .as_ref()
            .is_some_and(|delegate| delegate(resource, principal))
        {
            return AccessDecision::Allow(AllowBasis::Delegate);
        }
        AccessDecision::Deny(DenyReason::NotAuthorized)
    }
}
