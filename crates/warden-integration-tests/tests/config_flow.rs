//! Building a `Warden` from configuration files.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use warden_auth::{AuthError, Warden};
use warden_config::{Config, ConfigError};
use warden_core::{RejectReason, TokenKey};
use warden_revocation::RevocationJanitor;
use warden_storage::{KvStore, MemoryKvStore};
use warden_telemetry::{LogConfig, LogFormat};
use warden_test::{TEST_SECRET, test_clock};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn two_source_toml(store_backend: &str) -> String {
    format!(
        r#"
[tokens]
default_ttl_secs = 900

[[sources]]
name = "primary"
issuer = "svc"
audience = "api"
secret = "{TEST_SECRET}"

[[sources]]
name = "legacy"
issuer = "svc-old"
audience = "api"
secret = "base64:bGVnYWN5LXNlY3JldC0wMTIzNDU2Nzg5YWJjZGVmZ2hpams="

[revocation.store]
backend = "{store_backend}"

[logging]
level = "debug"
format = "json"
directives = ["warden_revocation=trace"]
"#
    )
}

#[tokio::test]
async fn test_warden_from_config_file() {
    let file = write_config(&two_source_toml("memory"));
    let config = Config::load_file(file.path()).unwrap();
    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.tokens.default_ttl_secs, 900);

    let warden = Warden::from_config(&config, test_clock()).unwrap();
    let issued = warden.issue("user-1", None, Map::new()).unwrap();
    assert_eq!(
        issued
            .expires_at
            .unix()
            .saturating_sub(issued.issued_at.unix()),
        900
    );

    let principal = warden.verify(&issued.token, None).await.unwrap();
    assert_eq!(principal.source, "primary");
    assert!(warden.verifier().source("legacy").is_some());
}

#[tokio::test]
async fn test_kv_store_shared_between_instances() {
    let mut config = Config::from_toml_str(&two_source_toml("kv")).unwrap();
    config.audit.persist = true;
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());

    let first = Warden::from_config_with_kv(&config, test_clock(), kv.clone()).unwrap();
    let issued = first.issue("user-1", None, Map::new()).unwrap();
    first.revoke_token(&issued.token, None).await.unwrap();

    // A second instance over the same store starts with an empty cache
    // and must still see the revocation.
    let second = Warden::from_config_with_kv(&config, test_clock(), kv).unwrap();
    assert!(second.is_revoked(&TokenKey::from_token(&issued.token)).await.unwrap());
    assert_eq!(
        second.verify(&issued.token, None).await,
        Err(RejectReason::Revoked)
    );
}

#[tokio::test]
async fn test_resynced_instance_sees_revocations_from_another() {
    let config = Config::from_toml_str(&two_source_toml("kv")).unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let first = Warden::from_config_with_kv(&config, test_clock(), kv.clone()).unwrap();
    let second = Warden::from_config_with_kv(&config, test_clock(), kv).unwrap();

    // Both caches become coherent before anything is revoked.
    RevocationJanitor::run_once(first.checker()).await;
    RevocationJanitor::run_once(second.checker()).await;
    assert!(second.checker().is_cache_coherent());

    let issued = first.issue("user-1", None, Map::new()).unwrap();
    assert!(second.verify(&issued.token, None).await.is_ok());
    first.revoke_token(&issued.token, None).await.unwrap();

    assert!(second.is_revoked(&issued.key).await.unwrap());
    assert_eq!(
        second.verify(&issued.token, None).await,
        Err(RejectReason::Revoked)
    );
}

#[test]
fn test_from_config_refuses_durable_backends() {
    let config = Config::from_toml_str(&two_source_toml("kv")).unwrap();
    assert!(matches!(
        Warden::from_config(&config, test_clock()),
        Err(AuthError::InvalidConfig { ref field, .. }) if field == "revocation.store.backend"
    ));

    let mut config = Config::from_toml_str(&two_source_toml("memory")).unwrap();
    config.audit.persist = true;
    assert!(matches!(
        Warden::from_config(&config, test_clock()),
        Err(AuthError::InvalidConfig { ref field, .. }) if field == "audit.persist"
    ));
}

#[test]
fn test_zero_janitor_interval_rejected_by_warden() {
    let mut config = Config::from_toml_str(&two_source_toml("memory")).unwrap();
    config.revocation.janitor_interval_secs = 0;
    assert!(matches!(
        Warden::from_config(&config, test_clock()),
        Err(AuthError::InvalidConfig { ref field, .. }) if field == "revocation.janitor_interval_secs"
    ));
}

#[test]
fn test_logging_section_drives_log_config() {
    let config = Config::from_toml_str(&two_source_toml("memory")).unwrap();
    let log = LogConfig::try_from(&config.logging).unwrap();
    assert_eq!(log.level, "debug");
    assert_eq!(log.format, LogFormat::Json);
    assert_eq!(log.directives, vec!["warden_revocation=trace"]);
}

#[test]
fn test_config_without_sources_rejected() {
    let file = write_config("[tokens]\ndefault_ttl_secs = 60\n");
    let err = Config::load_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }), "{err:?}");
}

#[test]
fn test_short_secret_rejected() {
    let file = write_config(
        r#"
[[sources]]
name = "primary"
issuer = "svc"
audience = "api"
secret = "too-short"
"#,
    );
    assert!(Config::load_file(file.path()).is_err());
}

#[test]
fn test_unknown_cache_backend_rejected_by_warden() {
    let mut config = Config::from_toml_str(&two_source_toml("memory")).unwrap();
    config.revocation.cache.backend = "memcached".to_string();
    assert!(matches!(
        Warden::from_config(&config, test_clock()),
        Err(AuthError::InvalidConfig { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_janitor_purges_expired_records() {
    let config = Config::from_toml_str(&two_source_toml("memory")).unwrap();
    let clock = test_clock();
    let warden = Warden::from_config(&config, clock.clone()).unwrap();

    let issued = warden.issue("user-1", None, Map::new()).unwrap();
    warden.revoke_token(&issued.token, None).await.unwrap();

    clock.advance_secs(901);
    tokio::time::advance(Duration::from_secs(901)).await;
    let cancel = CancellationToken::new();
    let handle = warden.spawn_janitor(cancel.clone());
    // Let the immediate first pass run.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    cancel.cancel();
    handle.await.unwrap();

    // The record is gone; the token itself is expired anyway.
    assert!(!warden.is_revoked(&issued.key).await.unwrap());
    assert_eq!(
        warden.verify(&issued.token, None).await,
        Err(RejectReason::Expired)
    );
}
