//! Revocation behaviour when the cache or the store misbehaves.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use warden_core::RejectReason;
use warden_revocation::{
    MemoryRevocationCache, MemoryRevocationStore, NoopRevocationCache, RevocationJanitor,
};
use warden_test::{
    CountingStore, SlowCache, SlowStore, UnreachableCache, UnreachableStore, WriteFailingCache,
};

#[tokio::test]
async fn test_revocation_survives_failed_cache_write() {
    let h = Harness::with_tiers(
        Arc::new(WriteFailingCache::new()),
        Arc::new(MemoryRevocationStore::new()),
    );
    let issued = h.issue("user-1");

    assert!(h.warden.revoke_token(&issued.token, None).await.unwrap());
    assert!(!h.warden.checker().is_cache_coherent());
    assert_eq!(h.audited("cache_degraded"), 1);

    // The cache still answers "not revoked", but is no longer trusted.
    assert!(h.warden.is_revoked(&issued.key).await.unwrap());
    assert_eq!(
        h.warden.verify(&issued.token, None).await,
        Err(RejectReason::Revoked)
    );
}

#[tokio::test]
async fn test_unreachable_cache_falls_back_to_store() {
    let h = Harness::with_tiers(
        Arc::new(UnreachableCache),
        Arc::new(MemoryRevocationStore::new()),
    );
    let valid = h.issue("user-1");
    let revoked = h.issue("user-2");

    assert!(h.warden.verify(&valid.token, None).await.is_ok());

    h.warden.revoke_token(&revoked.token, None).await.unwrap();
    assert_eq!(
        h.warden.verify(&revoked.token, None).await,
        Err(RejectReason::Revoked)
    );
    assert!(h.audited("cache_degraded") >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_cache_falls_back_to_store() {
    let h = Harness::with_tiers(
        Arc::new(SlowCache::new(
            Duration::from_secs(1),
            Arc::new(MemoryRevocationCache::new()),
        )),
        Arc::new(MemoryRevocationStore::new()),
    );
    let issued = h.issue("user-1");

    assert!(h.warden.verify(&issued.token, None).await.is_ok());
    let degraded = h.audit.events_named("cache_degraded");
    assert_eq!(degraded.len(), 1);
    assert!(degraded[0].description().contains("timed out"));
}

#[tokio::test]
async fn test_unreachable_store_fails_closed() {
    let h = Harness::with_tiers(Arc::new(NoopRevocationCache), Arc::new(UnreachableStore));
    let issued = h.issue("user-1");

    assert_eq!(
        h.warden.verify(&issued.token, None).await,
        Err(RejectReason::StoreUnavailable)
    );
    assert!(h.warden.is_revoked(&issued.key).await.is_err());
    assert_eq!(h.audited("store_unavailable"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_fails_closed() {
    let h = Harness::with_tiers(
        Arc::new(NoopRevocationCache),
        Arc::new(SlowStore::new(
            Duration::from_secs(5),
            Arc::new(MemoryRevocationStore::new()),
        )),
    );
    let issued = h.issue("user-1");

    assert_eq!(
        h.warden.verify(&issued.token, None).await,
        Err(RejectReason::StoreUnavailable)
    );
}

#[tokio::test]
async fn test_revoke_fails_when_store_down() {
    let h = Harness::with_tiers(
        Arc::new(MemoryRevocationCache::new()),
        Arc::new(UnreachableStore),
    );
    let issued = h.issue("user-1");

    assert!(h.warden.revoke_token(&issued.token, None).await.is_err());
    // Nothing was mirrored: the cache never learns of a revocation the
    // store did not accept.
    assert_eq!(h.audited("token_revoked"), 0);
}

#[tokio::test]
async fn test_coherent_cache_answers_without_store() {
    let store = Arc::new(CountingStore::new());
    let h = Harness::with_tiers(Arc::new(MemoryRevocationCache::new()), store.clone());
    let valid = h.issue("user-1");
    let revoked = h.issue("user-2");
    h.warden.revoke_token(&revoked.token, None).await.unwrap();

    assert!(h.warden.verify(&valid.token, None).await.is_ok());
    assert_eq!(
        h.warden.verify(&revoked.token, None).await,
        Err(RejectReason::Revoked)
    );
    assert_eq!(store.inserts(), 1);
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn test_cold_cache_consults_store_until_resync() {
    let store = Arc::new(CountingStore::new());
    let h = Harness::with_cold_tiers(Arc::new(MemoryRevocationCache::new()), store.clone());
    let issued = h.issue("user-1");

    assert!(h.warden.verify(&issued.token, None).await.is_ok());
    assert_eq!(store.lookups(), 1);

    let report = RevocationJanitor::run_once(h.warden.checker()).await;
    assert_eq!(report.resynced, Some(0));
    assert!(h.warden.checker().is_cache_coherent());

    assert!(h.warden.verify(&issued.token, None).await.is_ok());
    assert_eq!(store.lookups(), 1);
}

#[tokio::test]
async fn test_health_reports_each_tier() {
    let h = Harness::with_tiers(
        Arc::new(UnreachableCache),
        Arc::new(MemoryRevocationStore::new()),
    );
    let health = h.warden.health().await;
    assert!(!health.cache.is_healthy());
    assert!(health.store.is_healthy());
    assert!(health.is_serving());

    let h = Harness::with_tiers(Arc::new(MemoryRevocationCache::new()), Arc::new(UnreachableStore));
    let health = h.warden.health().await;
    assert!(health.cache.is_healthy());
    assert!(!health.is_serving());
}
