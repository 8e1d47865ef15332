//! Mapping of outcomes to transport responses.
//!
//! Every rejection becomes the same 401 and every denial the same 403 or
//! 404. Bodies are fixed strings; internal reasons stay in logs and audit.

use serde::Serialize;
use warden_core::RejectReason;

use crate::guard::AccessDenied;

/// Body of every authentication failure.
pub const UNAUTHENTICATED_BODY: &str = "unauthenticated";
/// Body of a 403 denial.
pub const FORBIDDEN_BODY: &str = "access denied";
/// Body of a 404 denial.
pub const NOT_FOUND_BODY: &str = "not found";

/// Status code and generic body to send to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: &'static str,
}

impl TransportResponse {
    /// 401.
    pub const UNAUTHENTICATED: Self = Self {
        status: 401,
        body: UNAUTHENTICATED_BODY,
    };
    /// 403.
    pub const FORBIDDEN: Self = Self {
        status: 403,
        body: FORBIDDEN_BODY,
    };
    /// 404.
    pub const NOT_FOUND: Self = Self {
        status: 404,
        body: NOT_FOUND_BODY,
    };
}

/// How a resource class reports denials.
///
/// Pick one per resource class and use it on every endpoint serving that
/// class, so status codes never reveal whether a resource exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DenialStatus {
    /// 403 for denials. Use where existence is not sensitive.
    #[default]
    Forbidden,
    /// 404 for denials and for missing resources alike.
    NotFound,
}

impl DenialStatus {
    /// Response for a resource that does not exist.
    ///
    /// With [`NotFound`](Self::NotFound) this is identical to a denial.
    #[must_use]
    pub fn missing_response(self) -> TransportResponse {
        TransportResponse::NOT_FOUND
    }
}

/// Conversion of an internal outcome into a client response.
pub trait ToResponse {
    /// The response to send.
    fn to_response(&self) -> TransportResponse;
}

impl ToResponse for RejectReason {
    fn to_response(&self) -> TransportResponse {
        // Infrastructure failures look the same to clients; operators see
        // them through the audit trail.
        TransportResponse::UNAUTHENTICATED
    }
}

impl AccessDenied {
    /// The response for this denial under the resource class's policy.
    #[must_use]
    pub fn to_response(&self, status: DenialStatus) -> TransportResponse {
        match status {
            DenialStatus::Forbidden => TransportResponse::FORBIDDEN,
            DenialStatus::NotFound => TransportResponse::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::DenyReason;

    const ALL_REASONS: [RejectReason; 8] = [
        RejectReason::Malformed,
        RejectReason::BadSignature,
        RejectReason::Expired,
        RejectReason::MissingClaim,
        RejectReason::WrongIssuer,
        RejectReason::WrongAudience,
        RejectReason::Revoked,
        RejectReason::StoreUnavailable,
    ];

    #[test]
    fn test_every_rejection_is_the_same_401() {
        for reason in ALL_REASONS {
            let response = reason.to_response();
            assert_eq!(response, TransportResponse::UNAUTHENTICATED);
            assert!(!response.body.contains(reason.as_str()));
        }
    }

    #[test]
    fn test_denial_status_per_resource_class() {
        let denied = AccessDenied::new(DenyReason::NotAuthorized);
        assert_eq!(denied.to_response(DenialStatus::Forbidden).status, 403);
        assert_eq!(denied.to_response(DenialStatus::NotFound).status, 404);
        assert_eq!(DenialStatus::default(), DenialStatus::Forbidden);
    }

    #[test]
    fn test_not_found_denial_is_indistinguishable_from_missing() {
        let denied = AccessDenied::new(DenyReason::NotAuthorized);
        assert_eq!(
            denied.to_response(DenialStatus::NotFound),
            DenialStatus::NotFound.missing_response()
        );
    }
}
