//! Common value types used throughout Warden.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain separation context for token key derivation.
const TOKEN_KEY_DOMAIN: &str = "warden-token-key v1";

/// Timestamp wrapper for consistent handling throughout Warden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current wall-clock timestamp.
    ///
    /// Components that make validity decisions should ask their [`Clock`](crate::Clock)
    /// instead so tests can control time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create a timestamp from Unix seconds.
    ///
    /// Returns `None` if the value is outside the representable range.
    #[must_use]
    pub fn from_unix(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Unix seconds (the JWT `NumericDate` representation).
    #[must_use]
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }

    /// Check whether this timestamp lies strictly before `now`.
    #[must_use]
    pub fn is_past_at(&self, now: Timestamp) -> bool {
        self.0 < now.0
    }

    /// Add a duration, saturating at the maximum representable instant.
    #[must_use]
    pub fn saturating_add(&self, duration: chrono::Duration) -> Self {
        Self(
            self.0
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Time remaining until this timestamp, or `None` if it is not in the future.
    #[must_use]
    pub fn remaining_from(&self, now: Timestamp) -> Option<std::time::Duration> {
        self.0
            .signed_duration_since(now.0)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Stable lookup key for a token in both revocation tiers.
///
/// The key is a domain-separated BLAKE3 hash of the raw token string,
/// hex-encoded. Raw bearer tokens are never written to a cache or store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(String);

impl TokenKey {
    /// Derive the key for a raw token string.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(TOKEN_KEY_DOMAIN);
        hasher.update(token.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Wrap an already-derived key (e.g. one read back from storage).
    ///
    /// Returns `None` unless the value is 64 lowercase hex characters.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let well_formed = value.len() == 64
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(value.to_owned()))
    }

    /// The full hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tk:{}", self.short())
    }
}
