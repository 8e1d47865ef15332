//! Namespaced key-value store trait and the in-memory implementation.
//!
//! Every operation is scoped to a namespace. Warden uses:
//!
//! - `revocation:records` for the authoritative revocation list
//! - `audit:events` for the persisted audit trail
//!
//! Values are opaque bytes; [`ScopedKvStore`] layers JSON on top.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{StorageError, StorageResult};

/// Reject namespaces that are empty or carry the reserved separator.
fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Reject keys that are empty or carry the reserved separator.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Async namespaced byte store.
///
/// Implementations must be safe to share across tasks. Errors are reported,
/// never swallowed: callers on the request path decide how to degrade.
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Read a value. `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Write a value, replacing any existing one.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Write a value only if the key is vacant, as one atomic step.
    /// Returns `true` if this call wrote it.
    async fn set_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<bool>;

    /// Remove a key. Returns `true` if it existed.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Check whether a key exists.
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// All keys currently present in a namespace, in no particular order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Remove every key in a namespace. Returns how many were removed.
    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64>;
}

/// In-process store backed by a concurrent map.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<(String, String), Vec<u8>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_key(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_owned(), key.to_owned())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self
            .entries
            .get(&Self::entry_key(namespace, key))
            .map(|v| v.value().clone()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.entries.insert(Self::entry_key(namespace, key), value);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        // The entry guard holds the shard write lock across check and insert.
        match self.entries.entry(Self::entry_key(namespace, key)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            },
        }
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self
            .entries
            .remove(&Self::entry_key(namespace, key))
            .is_some())
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self.entries.contains_key(&Self::entry_key(namespace, key)))
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().0 == namespace)
            .map(|e| e.key().1.clone())
            .collect())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        validate_namespace(namespace)?;
        let before = self.entries.len();
        self.entries.retain(|(ns, _), _| ns != namespace);
        let removed = before.saturating_sub(self.entries.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

/// A [`KvStore`] view with the namespace fixed up front.
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Bind `store` to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty or
    /// contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The bound namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read raw bytes.
    ///
    /// # Errors
    ///
    /// Propagates backend and key-validation errors.
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.namespace, key).await
    }

    /// Write raw bytes.
    ///
    /// # Errors
    ///
    /// Propagates backend and key-validation errors.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(&self.namespace, key, value).await
    }

    /// Write raw bytes only if the key is vacant. Returns `true` if written.
    ///
    /// # Errors
    ///
    /// Propagates backend and key-validation errors.
    pub async fn set_if_absent(&self, key: &str, value: Vec<u8>) -> StorageResult<bool> {
        self.inner.set_if_absent(&self.namespace, key, value).await
    }

    /// Remove a key. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Propagates backend and key-validation errors.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(&self.namespace, key).await
    }

    /// Check whether a key exists.
    ///
    /// # Errors
    ///
    /// Propagates backend and key-validation errors.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(&self.namespace, key).await
    }

    /// All keys in the namespace.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }

    /// Remove every key in the namespace.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.inner.clear_namespace(&self.namespace).await
    }

    /// Read and decode a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored bytes are not
    /// valid JSON for `T`.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Encode a value as JSON and write it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, bytes).await
    }

    /// Encode a value as JSON and write it only if the key is vacant.
    /// Returns `true` if written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub async fn set_json_if_absent<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<bool> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set_if_absent(key, bytes).await
    }
}
