//! The authoritative revocation store.
//!
//! Whatever the store says is the truth. The checker only ever falls back
//! to "not revoked" when the store itself says so.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use warden_core::{Timestamp, TokenKey};
use warden_storage::{KvStore, ScopedKvStore};

use crate::error::RevocationResult;
use crate::record::RevocationRecord;

/// Namespace revocation records are written to in a [`KvStore`].
pub const NS_REVOCATION_RECORDS: &str = "revocation:records";

/// Key probed by [`KvRevocationStore::ping`]. Never written.
const PROBE_KEY: &str = "__probe__";

/// Durable, authoritative record of revoked tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync + std::fmt::Debug {
    /// Insert a record. Idempotent: inserting a key that is already present
    /// keeps the existing record and returns `Ok(false)`.
    async fn insert(&self, record: RevocationRecord) -> RevocationResult<bool>;

    /// Whether a record exists for `key`.
    async fn contains(&self, key: &TokenKey) -> RevocationResult<bool>;

    /// Records not yet past their retention at `now`.
    async fn active_records(&self, now: Timestamp) -> RevocationResult<Vec<RevocationRecord>>;

    /// Drop records whose retention ended at or before `now`. Returns the
    /// number removed.
    async fn purge_expired(&self, now: Timestamp) -> RevocationResult<usize>;

    /// Connectivity probe.
    async fn ping(&self) -> RevocationResult<()>;
}

/// In-process store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    records: DashMap<TokenKey, RevocationRecord>,
}

impl MemoryRevocationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &TokenKey) -> Option<RevocationRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(&self, record: RevocationRecord) -> RevocationResult<bool> {
        match self.records.entry(record.key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            },
        }
    }

    async fn contains(&self, key: &TokenKey) -> RevocationResult<bool> {
        Ok(self.records.contains_key(key))
    }

    async fn active_records(&self, now: Timestamp) -> RevocationResult<Vec<RevocationRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| !r.value().is_expired_at(now))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn purge_expired(&self, now: Timestamp) -> RevocationResult<usize> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired_at(now));
        Ok(before.saturating_sub(self.records.len()))
    }

    async fn ping(&self) -> RevocationResult<()> {
        Ok(())
    }
}

/// Store persisting records as JSON in any [`KvStore`], under
/// [`NS_REVOCATION_RECORDS`], keyed by the token key's hex form.
#[derive(Debug, Clone)]
pub struct KvRevocationStore {
    store: ScopedKvStore,
}

impl KvRevocationStore {
    /// Bind to a key-value backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the namespace.
    pub fn new(store: Arc<dyn KvStore>) -> RevocationResult<Self> {
        Ok(Self {
            store: ScopedKvStore::new(store, NS_REVOCATION_RECORDS)?,
        })
    }

    async fn all_records(&self) -> RevocationResult<Vec<RevocationRecord>> {
        let keys = self.store.list_keys().await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.store.get_json::<RevocationRecord>(&key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl RevocationStore for KvRevocationStore {
    async fn insert(&self, record: RevocationRecord) -> RevocationResult<bool> {
        Ok(self
            .store
            .set_json_if_absent(record.key.as_str(), &record)
            .await?)
    }

    async fn contains(&self, key: &TokenKey) -> RevocationResult<bool> {
        Ok(self.store.exists(key.as_str()).await?)
    }

    async fn active_records(&self, now: Timestamp) -> RevocationResult<Vec<RevocationRecord>> {
        let mut records = self.all_records().await?;
        records.retain(|r| !r.is_expired_at(now));
        Ok(records)
    }

    async fn purge_expired(&self, now: Timestamp) -> RevocationResult<usize> {
        let mut removed: usize = 0;
        for record in self.all_records().await? {
            if record.is_expired_at(now) && self.store.delete(record.key.as_str()).await? {
                removed = removed.saturating_add(1);
            }
        }
        debug!(removed, "Purged expired revocation records");
        Ok(removed)
    }

    async fn ping(&self) -> RevocationResult<()> {
        self.store.exists(PROBE_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_storage::MemoryKvStore;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix(secs).unwrap()
    }

    fn record(token: &str, expires: i64) -> RevocationRecord {
        RevocationRecord::new(TokenKey::from_token(token), at(1_000), at(expires))
    }

    fn stores() -> Vec<Box<dyn RevocationStore>> {
        vec![
            Box::new(MemoryRevocationStore::new()),
            Box::new(KvRevocationStore::new(Arc::new(MemoryKvStore::new())).unwrap()),
        ]
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        for store in stores() {
            let first = record("t1", 2_000);
            assert!(store.insert(first.clone()).await.unwrap());
            assert!(
                !store
                    .insert(first.clone().with_reason("again"))
                    .await
                    .unwrap()
            );
            assert!(store.contains(&first.key).await.unwrap());

            let active = store.active_records(at(1_500)).await.unwrap();
            assert_eq!(active, vec![first]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_have_one_winner() {
        let stores: Vec<Arc<dyn RevocationStore>> = vec![
            Arc::new(MemoryRevocationStore::new()),
            Arc::new(KvRevocationStore::new(Arc::new(MemoryKvStore::new())).unwrap()),
        ];
        for store in stores {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = store.clone();
                    let r = record("t1", 2_000).with_reason(format!("attempt-{i}"));
                    tokio::spawn(async move { store.insert(r).await })
                })
                .collect();

            let mut winners: usize = 0;
            for handle in handles {
                if handle.await.unwrap().unwrap() {
                    winners = winners.saturating_add(1);
                }
            }
            assert_eq!(winners, 1);

            let active = store.active_records(at(1_500)).await.unwrap();
            assert_eq!(active.len(), 1);
            assert!(active[0].reason.as_deref().unwrap().starts_with("attempt-"));
        }
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_contained() {
        for store in stores() {
            assert!(
                !store
                    .contains(&TokenKey::from_token("never"))
                    .await
                    .unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired() {
        for store in stores() {
            store.insert(record("old", 1_100)).await.unwrap();
            store.insert(record("live", 5_000)).await.unwrap();

            assert_eq!(store.purge_expired(at(1_100)).await.unwrap(), 1);
            assert!(!store.contains(&TokenKey::from_token("old")).await.unwrap());
            assert!(store.contains(&TokenKey::from_token("live")).await.unwrap());
            assert_eq!(store.purge_expired(at(1_100)).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_active_records_excludes_expired() {
        for store in stores() {
            store.insert(record("old", 1_100)).await.unwrap();
            store.insert(record("live", 5_000)).await.unwrap();

            let active = store.active_records(at(2_000)).await.unwrap();
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].key, TokenKey::from_token("live"));
        }
    }

    #[tokio::test]
    async fn test_ping() {
        for store in stores() {
            store.ping().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_kv_store_uses_its_namespace() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = KvRevocationStore::new(kv.clone()).unwrap();
        let r = record("t1", 2_000);
        store.insert(r.clone()).await.unwrap();

        let keys = kv.list_keys(NS_REVOCATION_RECORDS).await.unwrap();
        assert_eq!(keys, vec![r.key.as_str().to_owned()]);
    }
}
