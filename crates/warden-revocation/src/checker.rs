//! Two-tier revocation checking.
//!
//! Reads go to the cache first and fall back to the store whenever the
//! cache cannot give a trustworthy answer. Writes go to the store first and
//! are then mirrored into the cache on a best-effort basis.
//!
//! # Failure semantics
//!
//! - Cache errors and timeouts degrade to the store and are never surfaced.
//! - Store errors and timeouts on the read path are returned as `Err`; the
//!   verifier rejects the token (fail closed).
//! - If the caller's future is dropped while a tier is being awaited,
//!   nothing is returned at all, so no token is ever accepted by accident.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};
use warden_audit::{AuditEvent, AuditKind, AuditSink};
use warden_core::{Clock, TokenKey};

use crate::cache::{CacheLookup, RevocationCache};
use crate::error::{RevocationError, RevocationResult, Tier};
use crate::record::RevocationRecord;
use crate::store::RevocationStore;

/// Default cache-tier budget.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(50);
/// Default store-tier budget.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(200);

/// Per-tier time budgets. A call that exceeds its budget counts as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTimeouts {
    /// Budget for a cache call.
    pub cache: Duration,
    /// Budget for a store call.
    pub store: Duration,
}

impl Default for TierTimeouts {
    fn default() -> Self {
        Self {
            cache: DEFAULT_CACHE_TIMEOUT,
            store: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Connectivity of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierStatus {
    /// The tier answered its probe in time.
    Healthy,
    /// The probe failed or timed out.
    Unhealthy {
        /// Error text.
        detail: String,
    },
}

impl TierStatus {
    /// Whether the tier is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Health report for both tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationHealth {
    /// Cache tier status.
    pub cache: TierStatus,
    /// Store tier status.
    pub store: TierStatus,
    /// Whether cache misses are currently trusted.
    pub cache_coherent: bool,
    /// Whether cache misses are always confirmed against the store.
    pub confirms_misses: bool,
}

impl RevocationHealth {
    /// Whether revocation checks can currently succeed. Only the store
    /// matters; a dead cache just makes checks slower.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.store.is_healthy()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Answers "is this token revoked?" from the cache when it can and from
/// the store when it must.
///
/// The cache is *coherent* while every revocation written through this
/// checker has been mirrored successfully. A failed mirror write makes it
/// incoherent: cache hits are still trusted, but cache misses are confirmed
/// against the store until [`resync_cache`](Self::resync_cache) succeeds.
///
/// When the cache is private to one process but the store is shared with
/// other instances, a coherent cache still misses revocations written
/// elsewhere. [`with_private_cache`](Self::with_private_cache) makes every
/// miss go to the store for that deployment shape.
#[derive(Debug)]
pub struct RevocationChecker {
    cache: Arc<dyn RevocationCache>,
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
    timeouts: TierTimeouts,
    audit: Option<Arc<dyn AuditSink>>,
    /// Bumped on every failed mirror write.
    mirror_failures: AtomicU64,
    /// Value of `mirror_failures` covered by the last successful resync.
    synced_through: AtomicU64,
    /// Never answer `false` from the cache alone.
    confirm_misses: bool,
}

impl RevocationChecker {
    /// Create a checker with default timeouts and no audit sink.
    #[must_use]
    pub fn new(
        cache: Arc<dyn RevocationCache>,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            store,
            clock,
            timeouts: TierTimeouts::default(),
            audit: None,
            mirror_failures: AtomicU64::new(0),
            synced_through: AtomicU64::new(0),
            confirm_misses: false,
        }
    }

    /// Override the tier budgets.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TierTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Report degradations and revocations to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Start with the cache marked incoherent.
    ///
    /// Use this when the store is durable but the cache may have lost
    /// entries (e.g. an in-process cache after a restart). Misses go to the
    /// store until the first successful resync.
    #[must_use]
    pub fn with_cold_cache(self) -> Self {
        self.mark_cache_incoherent();
        self
    }

    /// Treat the cache as private to this process.
    ///
    /// Other instances write revocations to the shared store without
    /// touching this cache, so a miss is confirmed against the store even
    /// while the cache is coherent. Cache hits still short-circuit.
    #[must_use]
    pub fn with_private_cache(mut self) -> Self {
        self.confirm_misses = true;
        self
    }

    /// Whether cache misses are always confirmed against the store.
    #[must_use]
    pub fn confirms_misses(&self) -> bool {
        self.confirm_misses
    }

    /// Configured tier budgets.
    #[must_use]
    pub fn timeouts(&self) -> TierTimeouts {
        self.timeouts
    }

    /// Whether cache misses are currently trusted.
    #[must_use]
    pub fn is_cache_coherent(&self) -> bool {
        self.synced_through.load(Ordering::SeqCst) >= self.mirror_failures.load(Ordering::SeqCst)
    }

    /// Stop trusting cache misses until the next successful resync.
    pub fn mark_cache_incoherent(&self) {
        self.mirror_failures.fetch_add(1, Ordering::SeqCst);
    }

    async fn emit(&self, kind: AuditKind) {
        if let Some(sink) = &self.audit {
            sink.record(AuditEvent::new(kind, self.clock.now())).await;
        }
    }

    async fn degrade(&self, operation: &str, err: &RevocationError) {
        warn!(tier = %Tier::Cache, operation, error = %err, "Revocation cache degraded");
        self.emit(AuditKind::CacheDegraded {
            operation: operation.to_owned(),
            detail: err.to_string(),
        })
        .await;
    }

    async fn store_down(&self, operation: &str, err: &RevocationError) {
        error!(tier = %Tier::Store, operation, error = %err, "Revocation store unavailable");
        self.emit(AuditKind::StoreUnavailable {
            operation: operation.to_owned(),
            detail: err.to_string(),
        })
        .await;
    }

    async fn lookup_cache(&self, key: &TokenKey) -> CacheLookup {
        let result = match timeout(self.timeouts.cache, self.cache.lookup(key)).await {
            Ok(inner) => inner,
            Err(_) => Err(RevocationError::Timeout {
                tier: Tier::Cache,
                timeout_ms: millis(self.timeouts.cache),
            }),
        };
        match result {
            Ok(lookup) => lookup,
            Err(e) => {
                self.degrade("lookup", &e).await;
                CacheLookup::Unknown
            },
        }
    }

    async fn with_store_budget<T>(
        &self,
        operation: &str,
        call: impl Future<Output = RevocationResult<T>>,
    ) -> RevocationResult<T> {
        let result = match timeout(self.timeouts.store, call).await {
            Ok(inner) => inner,
            Err(_) => Err(RevocationError::Timeout {
                tier: Tier::Store,
                timeout_ms: millis(self.timeouts.store),
            }),
        };
        if let Err(e) = &result {
            self.store_down(operation, e).await;
        }
        result
    }

    async fn mirror(&self, record: &RevocationRecord) -> RevocationResult<()> {
        let Some(ttl) = record.remaining_at(self.clock.now()) else {
            return Ok(());
        };
        match timeout(self.timeouts.cache, self.cache.mirror(&record.key, ttl)).await {
            Ok(inner) => inner,
            Err(_) => Err(RevocationError::Timeout {
                tier: Tier::Cache,
                timeout_ms: millis(self.timeouts.cache),
            }),
        }
    }

    /// Whether `key` is revoked.
    ///
    /// # Errors
    ///
    /// Returns an error when the answer had to come from the store and the
    /// store failed or timed out. Callers must treat that as "revoked".
    pub async fn is_revoked(&self, key: &TokenKey) -> RevocationResult<bool> {
        let started = Instant::now();

        match self.lookup_cache(key).await {
            CacheLookup::Revoked => {
                debug!(key = %key, tier = "cache", elapsed_ms = millis(started.elapsed()), "Revocation hit");
                return Ok(true);
            },
            CacheLookup::NotRevoked if !self.confirm_misses && self.is_cache_coherent() => {
                debug!(key = %key, tier = "cache", elapsed_ms = millis(started.elapsed()), "Revocation miss");
                return Ok(false);
            },
            CacheLookup::NotRevoked | CacheLookup::Unknown => {},
        }

        let revoked = self
            .with_store_budget("contains", self.store.contains(key))
            .await?;
        debug!(
            key = %key,
            tier = "store",
            revoked,
            elapsed_ms = millis(started.elapsed()),
            "Revocation answered by store"
        );
        Ok(revoked)
    }

    /// Revoke a token.
    ///
    /// The record is written to the store first. Only after the store has
    /// accepted it is the key mirrored into the cache, with a TTL equal to
    /// the record's remaining lifetime. A failed mirror write does not fail
    /// the revocation; it marks the cache incoherent instead.
    ///
    /// Returns `true` if the store had no record for this key yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails or times out. Nothing is
    /// mirrored in that case.
    pub async fn revoke(&self, record: RevocationRecord) -> RevocationResult<bool> {
        let inserted = self
            .with_store_budget("insert", self.store.insert(record.clone()))
            .await?;

        if inserted {
            info!(key = %record.key, expires_at = %record.expires_at, "Token revoked");
            self.emit(AuditKind::TokenRevoked {
                key: record.key.clone(),
                expires_at: record.expires_at,
            })
            .await;
        } else {
            debug!(key = %record.key, "Token already revoked");
        }

        if let Err(e) = self.mirror(&record).await {
            self.mark_cache_incoherent();
            self.degrade("mirror", &e).await;
        }

        Ok(inserted)
    }

    /// Re-mirror every active store record into the cache.
    ///
    /// Restores coherence when every write succeeds. Returns the number of
    /// records mirrored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list its records or any mirror
    /// write fails; the cache then stays incoherent.
    pub async fn resync_cache(&self) -> RevocationResult<usize> {
        let epoch = self.mirror_failures.load(Ordering::SeqCst);
        let records = match self.store.active_records(self.clock.now()).await {
            Ok(records) => records,
            Err(e) => {
                self.store_down("active_records", &e).await;
                return Err(e);
            },
        };

        let mut failed: usize = 0;
        let mut last_error = None;
        for record in &records {
            if let Err(e) = self.mirror(record).await {
                failed = failed.saturating_add(1);
                last_error = Some(e);
            }
        }

        if let Some(e) = last_error {
            let err = RevocationError::Cache(format!(
                "{failed} of {} mirror writes failed, last: {e}",
                records.len()
            ));
            self.degrade("resync", &err).await;
            return Err(err);
        }

        self.synced_through.fetch_max(epoch, Ordering::SeqCst);
        info!(
            mirrored = records.len(),
            coherent = self.is_cache_coherent(),
            "Revocation cache resynced"
        );
        Ok(records.len())
    }

    /// Drop store records whose retention has ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn purge_expired(&self) -> RevocationResult<usize> {
        match self.store.purge_expired(self.clock.now()).await {
            Ok(removed) => Ok(removed),
            Err(e) => {
                self.store_down("purge", &e).await;
                Err(e)
            },
        }
    }

    /// Drop expired cache entries within the cache budget.
    ///
    /// Returns `None` when the cache failed or timed out; that is reported
    /// as a degradation and never surfaced.
    pub async fn evict_cache(&self) -> Option<usize> {
        let result = match timeout(self.timeouts.cache, self.cache.evict_expired()).await {
            Ok(inner) => inner,
            Err(_) => Err(RevocationError::Timeout {
                tier: Tier::Cache,
                timeout_ms: millis(self.timeouts.cache),
            }),
        };
        match result {
            Ok(evicted) => Some(evicted),
            Err(e) => {
                self.degrade("evict", &e).await;
                None
            },
        }
    }

    /// Probe both tiers concurrently, each within its budget.
    pub async fn health(&self) -> RevocationHealth {
        async fn probe(
            budget: Duration,
            tier: Tier,
            call: impl Future<Output = RevocationResult<()>>,
        ) -> TierStatus {
            match timeout(budget, call).await {
                Ok(Ok(())) => TierStatus::Healthy,
                Ok(Err(e)) => TierStatus::Unhealthy {
                    detail: e.to_string(),
                },
                Err(_) => TierStatus::Unhealthy {
                    detail: RevocationError::Timeout {
                        tier,
                        timeout_ms: millis(budget),
                    }
                    .to_string(),
                },
            }
        }

        let (cache, store) = tokio::join!(
            probe(self.timeouts.cache, Tier::Cache, self.cache.ping()),
            probe(self.timeouts.store, Tier::Store, self.store.ping()),
        );
        RevocationHealth {
            cache,
            store,
            cache_coherent: self.is_cache_coherent(),
            confirms_misses: self.confirm_misses,
        }
    }
}
