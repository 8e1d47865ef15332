//! Revocation error types.

use thiserror::Error;

/// Which revocation tier an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The fast, possibly stale cache.
    Cache,
    /// The authoritative store.
    Store,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => f.write_str("cache"),
            Self::Store => f.write_str("store"),
        }
    }
}

/// Errors that can occur in the revocation tiers.
#[derive(Debug, Error)]
pub enum RevocationError {
    /// The authoritative store failed.
    #[error("revocation store error: {0}")]
    Store(String),

    /// The cache tier failed.
    #[error("revocation cache error: {0}")]
    Cache(String),

    /// A tier did not answer within its budget.
    #[error("revocation {tier} timed out after {timeout_ms}ms")]
    Timeout {
        /// The tier that timed out.
        tier: Tier,
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// A stored record could not be encoded or decoded.
    #[error("revocation record serialization error: {0}")]
    Serialization(String),
}

impl RevocationError {
    /// The tier this error belongs to.
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Cache(_) => Tier::Cache,
            Self::Timeout { tier, .. } => *tier,
            Self::Store(_) | Self::Serialization(_) => Tier::Store,
        }
    }
}

impl From<warden_storage::StorageError> for RevocationError {
    fn from(err: warden_storage::StorageError) -> Self {
        match err {
            warden_storage::StorageError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

/// Result type for revocation operations.
pub type RevocationResult<T> = Result<T, RevocationError>;
