//! The revocation cache tier.
//!
//! A fast, ephemeral mirror of recently revoked tokens. Entries carry a TTL
//! equal to the token's remaining lifetime so they expire on their own.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use warden_core::TokenKey;

use crate::error::RevocationResult;

/// Answer from a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLookup {
    /// The cache holds a live entry for the key.
    Revoked,
    /// The cache answered and has no entry for the key.
    NotRevoked,
    /// The cache cannot answer either way. The store must be asked.
    Unknown,
}

/// Fast, possibly stale mirror of revoked token keys.
#[async_trait]
pub trait RevocationCache: Send + Sync + std::fmt::Debug {
    /// Look up a key.
    async fn lookup(&self, key: &TokenKey) -> RevocationResult<CacheLookup>;

    /// Mirror a revocation for `ttl`.
    async fn mirror(&self, key: &TokenKey, ttl: Duration) -> RevocationResult<()>;

    /// Connectivity probe.
    async fn ping(&self) -> RevocationResult<()>;

    /// Drop entries whose TTL has passed. Returns the number removed.
    ///
    /// Backends that expire entries on their own keep the default no-op.
    async fn evict_expired(&self) -> RevocationResult<usize> {
        Ok(0)
    }
}

/// In-process cache backed by a concurrent map. Expired entries are
/// dropped when read.
#[derive(Debug, Default)]
pub struct MemoryRevocationCache {
    entries: DashMap<TokenKey, Instant>,
}

impl MemoryRevocationCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including ones that expired but were not read yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationCache for MemoryRevocationCache {
    async fn lookup(&self, key: &TokenKey) -> RevocationResult<CacheLookup> {
        let now = Instant::now();
        let live = self.entries.get(key).map(|deadline| *deadline > now);
        match live {
            Some(true) => Ok(CacheLookup::Revoked),
            Some(false) => {
                self.entries.remove_if(key, |_, deadline| *deadline <= now);
                Ok(CacheLookup::NotRevoked)
            },
            None => Ok(CacheLookup::NotRevoked),
        }
    }

    async fn mirror(&self, key: &TokenKey, ttl: Duration) -> RevocationResult<()> {
        let now = Instant::now();
        let deadline = now.checked_add(ttl).unwrap_or(now);
        self.entries.insert(key.clone(), deadline);
        Ok(())
    }

    async fn ping(&self) -> RevocationResult<()> {
        Ok(())
    }

    async fn evict_expired(&self) -> RevocationResult<usize> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, deadline| *deadline > now);
        Ok(before.saturating_sub(self.entries.len()))
    }
}

/// A deployment without a cache tier. Every lookup is [`CacheLookup::Unknown`]
/// so every check goes to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRevocationCache;

#[async_trait]
impl RevocationCache for NoopRevocationCache {
    async fn lookup(&self, _key: &TokenKey) -> RevocationResult<CacheLookup> {
        Ok(CacheLookup::Unknown)
    }

    async fn mirror(&self, _key: &TokenKey, _ttl: Duration) -> RevocationResult<()> {
        Ok(())
    }

    async fn ping(&self) -> RevocationResult<()> {
        Ok(())
    }
}
