//! Warden Revocation - Two-tier token revocation.
//!
//! This crate provides:
//! - [`RevocationStore`]: the durable, authoritative record of revoked tokens
//! - [`RevocationCache`]: a fast, self-expiring mirror of it
//! - [`RevocationChecker`]: cache-first reads with store fallback, store-first
//!   writes, per-tier timeouts and fail-closed store errors
//! - [`RevocationJanitor`]: periodic purge and cache resync
//!
//! With the `redis` feature, `RedisRevocationCache` provides a Redis cache
//! tier.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_core::{SystemClock, TokenKey};
//! use warden_revocation::prelude::*;
//!
//! # async fn example() -> RevocationResult<()> {
//! let checker = RevocationChecker::new(
//!     Arc::new(MemoryRevocationCache::new()),
//!     Arc::new(MemoryRevocationStore::new()),
//!     Arc::new(SystemClock),
//! );
//! let revoked = checker.is_revoked(&TokenKey::from_token("a.b.c")).await?;
//! assert!(!revoked);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod cache;
mod checker;
mod error;
mod janitor;
mod record;
mod store;

#[cfg(feature = "redis")]
mod redis_cache;

pub use cache::{CacheLookup, MemoryRevocationCache, NoopRevocationCache, RevocationCache};
pub use checker::{
    DEFAULT_CACHE_TIMEOUT, DEFAULT_STORE_TIMEOUT, RevocationChecker, RevocationHealth,
    TierStatus, TierTimeouts,
};
pub use error::{RevocationError, RevocationResult, Tier};
pub use janitor::{JanitorReport, MIN_JANITOR_INTERVAL, RevocationJanitor};
pub use record::RevocationRecord;
pub use store::{KvRevocationStore, MemoryRevocationStore, NS_REVOCATION_RECORDS, RevocationStore};

#[cfg(feature = "redis")]
pub use redis_cache::{DEFAULT_KEY_PREFIX, RedisRevocationCache};
