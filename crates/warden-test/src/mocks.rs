//! Failure-injecting revocation tiers.
//!
//! Each double wraps (or replaces) a real tier so tests can simulate an
//! unreachable, slow or write-failing cache or store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use warden_core::{Timestamp, TokenKey};
use warden_revocation::{
    CacheLookup, MemoryRevocationCache, MemoryRevocationStore, RevocationCache, RevocationError,
    RevocationRecord, RevocationResult, RevocationStore,
};

fn refused(tier: &str) -> String {
    format!("{tier} unreachable: connection refused")
}

/// A cache whose every call fails as if the connection were refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableCache;

#[async_trait]
impl RevocationCache for UnreachableCache {
    async fn lookup(&self, _key: &TokenKey) -> RevocationResult<CacheLookup> {
        Err(RevocationError::Cache(refused("cache")))
    }

    async fn mirror(&self, _key: &TokenKey, _ttl: Duration) -> RevocationResult<()> {
        Err(RevocationError::Cache(refused("cache")))
    }

    async fn ping(&self) -> RevocationResult<()> {
        Err(RevocationError::Cache(refused("cache")))
    }
}

/// A working in-memory cache whose writes fail. Reads answer from whatever
/// was mirrored before, i.e. nothing.
#[derive(Debug, Default)]
pub struct WriteFailingCache {
    inner: MemoryRevocationCache,
}

impl WriteFailingCache {
    /// Create the cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationCache for WriteFailingCache {
    async fn lookup(&self, key: &TokenKey) -> RevocationResult<CacheLookup> {
        self.inner.lookup(key).await
    }

    async fn mirror(&self, _key: &TokenKey, _ttl: Duration) -> RevocationResult<()> {
        Err(RevocationError::Cache("write rejected: READONLY".to_string()))
    }

    async fn ping(&self) -> RevocationResult<()> {
        Ok(())
    }
}

/// A cache that sleeps before every call, then delegates.
#[derive(Debug)]
pub struct SlowCache {
    delay: Duration,
    inner: Arc<dyn RevocationCache>,
}

impl SlowCache {
    /// Delay every call to `inner` by `delay`.
    #[must_use]
    pub fn new(delay: Duration, inner: Arc<dyn RevocationCache>) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl RevocationCache for SlowCache {
    async fn lookup(&self, key: &TokenKey) -> RevocationResult<CacheLookup> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup(key).await
    }

    async fn mirror(&self, key: &TokenKey, ttl: Duration) -> RevocationResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.mirror(key, ttl).await
    }

    async fn ping(&self) -> RevocationResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.ping().await
    }

    async fn evict_expired(&self) -> RevocationResult<usize> {
        tokio::time::sleep(self.delay).await;
        self.inner.evict_expired().await
    }
}

/// A store whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableStore;

#[async_trait]
impl RevocationStore for UnreachableStore {
    async fn insert(&self, _record: RevocationRecord) -> RevocationResult<bool> {
        Err(RevocationError::Store(refused("store")))
    }

    async fn contains(&self, _key: &TokenKey) -> RevocationResult<bool> {
        Err(RevocationError::Store(refused("store")))
    }

    async fn active_records(&self, _now: Timestamp) -> RevocationResult<Vec<RevocationRecord>> {
        Err(RevocationError::Store(refused("store")))
    }

    async fn purge_expired(&self, _now: Timestamp) -> RevocationResult<usize> {
        Err(RevocationError::Store(refused("store")))
    }

    async fn ping(&self) -> RevocationResult<()> {
        Err(RevocationError::Store(refused("store")))
    }
}

/// A store that sleeps before every call, then delegates.
#[derive(Debug)]
pub struct SlowStore {
    delay: Duration,
    inner: Arc<dyn RevocationStore>,
}

impl SlowStore {
    /// Delay every call to `inner` by `delay`.
    #[must_use]
    pub fn new(delay: Duration, inner: Arc<dyn RevocationStore>) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl RevocationStore for SlowStore {
    async fn insert(&self, record: RevocationRecord) -> RevocationResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(record).await
    }

    async fn contains(&self, key: &TokenKey) -> RevocationResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.contains(key).await
    }

    async fn active_records(&self, now: Timestamp) -> RevocationResult<Vec<RevocationRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.active_records(now).await
    }

    async fn purge_expired(&self, now: Timestamp) -> RevocationResult<usize> {
        tokio::time::sleep(self.delay).await;
        self.inner.purge_expired(now).await
    }

    async fn ping(&self) -> RevocationResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.ping().await
    }
}

/// An in-memory store that counts calls, to assert which tier answered.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryRevocationStore,
    inserts: AtomicUsize,
    lookups: AtomicUsize,
}

impl CountingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert` calls so far.
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `contains` calls so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RevocationStore for CountingStore {
    async fn insert(&self, record: RevocationRecord) -> RevocationResult<bool> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn contains(&self, key: &TokenKey) -> RevocationResult<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.contains(key).await
    }

    async fn active_records(&self, now: Timestamp) -> RevocationResult<Vec<RevocationRecord>> {
        self.inner.active_records(now).await
    }

    async fn purge_expired(&self, now: Timestamp) -> RevocationResult<usize> {
        self.inner.purge_expired(now).await
    }

    async fn ping(&self) -> RevocationResult<()> {
        self.inner.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_failing_cache_reads_but_never_stores() {
        let cache = WriteFailingCache::new();
        let key = TokenKey::from_token("t1");
        assert!(cache.mirror(&key, Duration::from_secs(60)).await.is_err());
        assert_eq!(cache.lookup(&key).await.unwrap(), CacheLookup::NotRevoked);
    }

    #[tokio::test]
    async fn test_counting_store_counts() {
        let store = CountingStore::new();
        let key = TokenKey::from_token("t1");
        let now = Timestamp::from_unix(1_700_000_000).unwrap();
        let expires = Timestamp::from_unix(1_700_000_600).unwrap();

        store
            .insert(RevocationRecord::new(key.clone(), now, expires))
            .await
            .unwrap();
        assert!(store.contains(&key).await.unwrap());
        assert_eq!((store.inserts(), store.lookups()), (1, 1));
    }

    #[tokio::test]
    async fn test_unreachable_tiers_fail_every_call() {
        let key = TokenKey::from_token("t1");
        assert!(UnreachableCache.lookup(&key).await.is_err());
        assert!(UnreachableStore.contains(&key).await.is_err());
        assert!(UnreachableStore.ping().await.is_err());
    }
}
