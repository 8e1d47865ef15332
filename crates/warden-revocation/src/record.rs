//! Revocation records.

use serde::{Deserialize, Serialize};
use warden_core::{Timestamp, TokenKey};

/// A token that must no longer be honored.
///
/// Records are written once and never updated. They may be dropped once
/// `expires_at` has passed, because the token would be rejected as expired
/// anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    /// Revocation key of the token.
    pub key: TokenKey,
    /// When the token was revoked.
    pub revoked_at: Timestamp,
    /// When the record may be garbage-collected. Never before `revoked_at`.
    pub expires_at: Timestamp,
    /// Free-text reason, e.g. `logout` or an incident reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RevocationRecord {
    /// Create a record.
    ///
    /// An `expires_at` earlier than `revoked_at` (revoking an already-expired
    /// token) is clamped to `revoked_at`; that is accepted, not an error.
    #[must_use]
    pub fn new(key: TokenKey, revoked_at: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            key,
            revoked_at,
            expires_at: expires_at.max(revoked_at),
            reason: None,
        }
    }

    /// Attach a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the record is past its retention at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Lifetime left at `now`, or `None` once expired.
    #[must_use]
    pub fn remaining_at(&self, now: Timestamp) -> Option<std::time::Duration> {
        self.expires_at.remaining_from(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix(secs).unwrap()
    }

    #[test]
    fn test_expiry_clamped_to_revocation_time() {
        let record = RevocationRecord::new(TokenKey::from_token("t"), at(1_000), at(900));
        assert_eq!(record.expires_at, at(1_000));
        assert!(record.is_expired_at(at(1_000)));
        assert_eq!(record.remaining_at(at(1_000)), None);
    }

    #[test]
    fn test_remaining_lifetime() {
        let record = RevocationRecord::new(TokenKey::from_token("t"), at(1_000), at(1_600))
            .with_reason("logout");
        assert!(!record.is_expired_at(at(1_000)));
        assert_eq!(
            record.remaining_at(at(1_000)),
            Some(std::time::Duration::from_secs(600))
        );
        assert_eq!(record.reason.as_deref(), Some("logout"));
    }

    #[test]
    fn test_reason_omitted_when_absent() {
        let record = RevocationRecord::new(TokenKey::from_token("t"), at(0), at(60));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("reason").is_none());
    }
}
