//! Redis-backed cache tier.
//!
//! Each revoked key is a Redis string `warden:revoked:<hex>` with value `1`
//! and an `EX` equal to the token's remaining lifetime. The connection is
//! opened lazily on first use, so a Redis outage at startup only degrades
//! the cache tier instead of failing construction.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use warden_core::TokenKey;

use crate::cache::{CacheLookup, RevocationCache};
use crate::error::{RevocationError, RevocationResult};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "warden:revoked:";

/// Cache tier backed by a Redis server.
pub struct RedisRevocationCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    prefix: String,
}

impl std::fmt::Debug for RedisRevocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRevocationCache")
            .field("prefix", &self.prefix)
            .field("connected", &self.conn.initialized())
            .finish_non_exhaustive()
    }
}

fn cache_err(e: &redis::RedisError) -> RevocationError {
    RevocationError::Cache(e.to_string())
}

impl RedisRevocationCache {
    /// Create a cache for the given `redis://` URL. No connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::Cache`] if the URL cannot be parsed.
    pub fn new(url: &str) -> RevocationResult<Self> {
        let client = redis::Client::open(url).map_err(|e| cache_err(&e))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            prefix: DEFAULT_KEY_PREFIX.to_owned(),
        })
    }

    /// Use a different key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn redis_key(&self, key: &TokenKey) -> String {
        format!("{}{}", self.prefix, key.as_str())
    }

    async fn connection(&self) -> RevocationResult<ConnectionManager> {
        self.conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .cloned()
            .map_err(|e| cache_err(&e))
    }
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn lookup(&self, key: &TokenKey) -> RevocationResult<CacheLookup> {
        let mut conn = self.connection().await?;
        let exists: bool = conn
            .exists(self.redis_key(key))
            .await
            .map_err(|e| cache_err(&e))?;
        Ok(if exists {
            CacheLookup::Revoked
        } else {
            CacheLookup::NotRevoked
        })
    }

    async fn mirror(&self, key: &TokenKey, ttl: Duration) -> RevocationResult<()> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.redis_key(key), 1u8, seconds)
            .await
            .map_err(|e| cache_err(&e))
    }

    async fn ping(&self) -> RevocationResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| cache_err(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            RedisRevocationCache::new("not a url"),
            Err(RevocationError::Cache(_))
        ));
    }

    #[test]
    fn test_key_layout() {
        let cache = RedisRevocationCache::new("redis://127.0.0.1:6379").unwrap();
        let key = TokenKey::from_token("t1");
        assert_eq!(
            cache.redis_key(&key),
            format!("warden:revoked:{}", key.as_str())
        );

        let cache = cache.with_prefix("svc:rv:");
        assert!(cache.redis_key(&key).starts_with("svc:rv:"));
    }

    #[test]
    fn test_debug_hides_url() {
        let cache = RedisRevocationCache::new("redis://:hunter2@127.0.0.1:6379").unwrap();
        assert!(!format!("{cache:?}").contains("hunter2"));
    }
}
