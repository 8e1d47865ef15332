//! The `Warden` facade: every component wired from one configuration.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};
use warden_audit::{AuditSink, FanoutAuditSink, KvAuditSink, TracingAuditSink};
use warden_config::Config;
use warden_core::{Clock, Principal, RejectReason, RequestMeta, Role, Timestamp, TokenKey};
use warden_revocation::{
    KvRevocationStore, MemoryRevocationCache, MemoryRevocationStore, NoopRevocationCache,
    RevocationCache, RevocationChecker, RevocationHealth, RevocationJanitor, RevocationRecord,
    RevocationStore, TierTimeouts,
};
use warden_storage::{KvStore, MemoryKvStore};
use warden_telemetry::{RequestContext, RequestGuard};
use warden_token::{IssueRequest, IssuedToken, TokenError};

use crate::error::{AuthError, AuthResult};
use crate::guard::{AccessDecision, AccessOptions, AuthorizationGuard, GuardedResource};
use crate::verifier::{TokenVerifier, TrustedSource};

/// Pre-built parts for [`Warden::with_components`].
#[derive(Debug)]
pub struct WardenComponents {
    /// Trusted sources, in match order.
    pub sources: Vec<TrustedSource>,
    /// Name of the source new tokens are issued from.
    pub primary_source: String,
    /// Revocation checker shared by verification and management calls.
    pub checker: Arc<RevocationChecker>,
    /// Where audit events go.
    pub audit: Arc<dyn AuditSink>,
    /// Time source for revocation records.
    pub clock: Arc<dyn Clock>,
    /// Lifetime of tokens issued without an explicit TTL.
    pub default_ttl: Duration,
    /// Period of the revocation janitor.
    pub janitor_interval: Duration,
    /// Whether successful verifications and grants are audited.
    pub record_successes: bool,
}

/// Authentication and authorization core.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Warden {
    primary: TrustedSource,
    verifier: TokenVerifier,
    guard: AuthorizationGuard,
    checker: Arc<RevocationChecker>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    janitor_interval: Duration,
}

impl Warden {
    /// Build from configuration with purely in-process backends.
    ///
    /// The `kv` store backend and persisted audit need a key-value store
    /// that outlives this instance; use
    /// [`from_config_with_kv`](Self::from_config_with_kv) for those.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, asks for a
    /// durable backend, or a configured backend cannot be built.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        if config.revocation.store.backend == "kv" {
            return Err(AuthError::invalid_config(
                "revocation.store.backend",
                "the kv backend needs a key-value store; use Warden::from_config_with_kv",
            ));
        }
        if config.audit.persist {
            return Err(AuthError::invalid_config(
                "audit.persist",
                "persisted audit needs a key-value store; use Warden::from_config_with_kv",
            ));
        }
        Self::from_config_with_kv(config, clock, Arc::new(MemoryKvStore::new()))
    }

    /// Build from configuration, using `kv` for the `kv` store backend and
    /// for persisted audit events.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a configured
    /// backend cannot be built.
    pub fn from_config_with_kv(
        config: &Config,
        clock: Arc<dyn Clock>,
        kv: Arc<dyn KvStore>,
    ) -> AuthResult<Self> {
        warden_config::validate::validate(config)?;

        let sources = config
            .sources
            .iter()
            .map(|section| TrustedSource::from_config(section, clock.clone()))
            .collect::<Result<Vec<_>, TokenError>>()?;

        let audit = build_audit(config, &kv)?;

        let revocation = &config.revocation;
        let cache = build_cache(config)?;
        let store: Arc<dyn RevocationStore> = match revocation.store.backend.as_str() {
            "memory" => Arc::new(MemoryRevocationStore::new()),
            "kv" => Arc::new(KvRevocationStore::new(kv)?),
            other => {
                return Err(AuthError::invalid_config(
                    "revocation.store.backend",
                    format!("unsupported backend '{other}'"),
                ));
            },
        };

        let mut checker = RevocationChecker::new(cache, store, clock.clone())
            .with_timeouts(TierTimeouts {
                cache: Duration::from_millis(revocation.cache.timeout_ms),
                store: Duration::from_millis(revocation.store.timeout_ms),
            })
            .with_audit(audit.clone());
        // A durable store outlives the cache; misses are not trusted until
        // the first resync. An in-process cache never sees revocations other
        // instances write to the shared store, so its misses are never
        // trusted at all.
        if revocation.store.backend == "kv" {
            checker = checker.with_cold_cache();
            if revocation.cache.backend == "memory" {
                checker = checker.with_private_cache();
            }
        }

        info!(
            sources = sources.len(),
            primary = %config.tokens.primary_source,
            cache = %revocation.cache.backend,
            store = %revocation.store.backend,
            "Warden configured"
        );

        Self::with_components(WardenComponents {
            sources,
            primary_source: config.tokens.primary_source.clone(),
            checker: Arc::new(checker),
            audit,
            clock,
            default_ttl: Duration::from_secs(config.tokens.default_ttl_secs),
            janitor_interval: Duration::from_secs(revocation.janitor_interval_secs),
            record_successes: config.audit.record_successes,
        })
    }

    /// Assemble from pre-built parts.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `primary_source` names none
    /// of the sources.
    pub fn with_components(parts: WardenComponents) -> AuthResult<Self> {
        let primary = parts
            .sources
            .iter()
            .find(|s| s.name == parts.primary_source)
            .cloned()
            .ok_or_else(|| {
                AuthError::invalid_config(
                    "tokens.primary_source",
                    format!("no trusted source named '{}'", parts.primary_source),
                )
            })?;

        let verifier = TokenVerifier::new(parts.sources, parts.checker.clone(), parts.audit.clone())
            .with_success_auditing(parts.record_successes);
        let guard =
            AuthorizationGuard::new(parts.audit.clone()).with_grant_auditing(parts.record_successes);

        Ok(Self {
            primary,
            verifier,
            guard,
            checker: parts.checker,
            audit: parts.audit,
            clock: parts.clock,
            default_ttl: parts.default_ttl,
            janitor_interval: parts.janitor_interval,
        })
    }

    /// The verifier.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// The authorization guard.
    #[must_use]
    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// The revocation checker.
    #[must_use]
    pub fn checker(&self) -> &Arc<RevocationChecker> {
        &self.checker
    }

    /// The audit sink.
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Issue a token from the primary source with the default lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(
        &self,
        subject: &str,
        role: Option<Role>,
        extra_claims: Map<String, Value>,
    ) -> AuthResult<IssuedToken> {
        self.issue_with_ttl(subject, role, extra_claims, self.default_ttl)
    }

    /// Issue a token from the primary source with an explicit lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` is under one second or signing fails.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        role: Option<Role>,
        extra_claims: Map<String, Value>,
        ttl: Duration,
    ) -> AuthResult<IssuedToken> {
        let _guard = RequestGuard::new(RequestContext::new("warden").with_operation("issue"));

        let mut request = IssueRequest::new(
            subject,
            self.primary.issuer.as_str(),
            self.primary.audience.as_str(),
            ttl,
        )
        .with_claims(extra_claims);
        request.role = role;

        let issued = self.primary.codec.issue(&request)?;
        info!(subject, key = %issued.key, expires_at = %issued.expires_at, "Token issued");
        Ok(issued)
    }

    /// Verify a raw token. See [`TokenVerifier::verify`].
    ///
    /// # Errors
    ///
    /// Returns the rejection reason.
    pub async fn verify(
        &self,
        token: &str,
        meta: Option<&RequestMeta>,
    ) -> Result<Principal, RejectReason> {
        let context = match meta {
            Some(meta) => RequestContext::from_meta("warden", meta),
            None => RequestContext::new("warden"),
        }
        .with_operation("verify");
        self.verifier
            .verify(token, meta)
            .instrument(context.span())
            .await
    }

    /// Authorize an operation. See [`AuthorizationGuard::authorize`].
    pub async fn authorize<R, F>(
        &self,
        principal: &Principal,
        resource: &R,
        owns: F,
        options: &AccessOptions<R>,
        meta: Option<&RequestMeta>,
    ) -> AccessDecision
    where
        R: GuardedResource,
        F: FnOnce(&R, &str) -> bool,
    {
        self.guard
            .authorize(principal, resource, owns, options, meta)
            .await
    }

    /// Revoke a raw token.
    ///
    /// The token must carry a valid signature from one of the trusted
    /// sources; its own `exp` sizes the revocation record. Expired tokens
    /// are accepted. Returns `true` if the token was not already revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Token`] if no trusted key verifies the token,
    /// or [`AuthError::Revocation`] if the store write fails.
    pub async fn revoke_token(&self, token: &str, reason: Option<&str>) -> AuthResult<bool> {
        let expires_at = self.signed_expiry(token)?;
        self.revoke_key(TokenKey::from_token(token), expires_at, reason)
            .await
    }

    /// Revoke by key, e.g. from an admin surface that only holds key and
    /// expiry. Returns `true` if the key was not already revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Revocation`] if the store write fails.
    pub async fn revoke_key(
        &self,
        key: TokenKey,
        expires_at: Timestamp,
        reason: Option<&str>,
    ) -> AuthResult<bool> {
        let mut record = RevocationRecord::new(key, self.clock.now(), expires_at);
        if let Some(reason) = reason {
            record = record.with_reason(reason);
        }
        Ok(self.checker.revoke(record).await?)
    }

    /// Diagnostic revocation lookup.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Revocation`] if the store had to be asked and
    /// failed.
    pub async fn is_revoked(&self, key: &TokenKey) -> AuthResult<bool> {
        Ok(self.checker.is_revoked(key).await?)
    }

    /// Connectivity of both revocation tiers.
    pub async fn health(&self) -> RevocationHealth {
        self.checker.health().await
    }

    /// Start the revocation janitor at the configured interval.
    #[must_use]
    pub fn spawn_janitor(&self, cancel: CancellationToken) -> JoinHandle<()> {
        RevocationJanitor::spawn(self.checker.clone(), self.janitor_interval, cancel)
    }

    fn signed_expiry(&self, token: &str) -> Result<Timestamp, TokenError> {
        let mut last_error = TokenError::BadSignature;
        for source in self.verifier.sources() {
            match source.codec.peek_expiry(token) {
                Ok(expires_at) => return Ok(expires_at),
                Err(e) if e.is_signature_failure() => last_error = e,
                Err(e) => return Err(e),
            }
        }
        warn!(key = %TokenKey::from_token(token), "Refusing to revoke token with no trusted signature");
        Err(last_error)
    }
}

fn build_audit(config: &Config, kv: &Arc<dyn KvStore>) -> AuthResult<Arc<dyn AuditSink>> {
    let mut fanout = FanoutAuditSink::new();
    if config.audit.tracing {
        fanout = fanout.with(Arc::new(TracingAuditSink));
    }
    if config.audit.persist {
        fanout = fanout.with(Arc::new(KvAuditSink::new(kv.clone())?));
    }
    Ok(Arc::new(fanout))
}

fn build_cache(config: &Config) -> AuthResult<Arc<dyn RevocationCache>> {
    let cache = &config.revocation.cache;
    match cache.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryRevocationCache::new())),
        "none" => Ok(Arc::new(NoopRevocationCache)),
        "redis" => redis_cache(cache.url.as_deref()),
        other => Err(AuthError::invalid_config(
            "revocation.cache.backend",
            format!("unsupported backend '{other}'"),
        )),
    }
}

#[cfg(feature = "redis")]
fn redis_cache(url: Option<&str>) -> AuthResult<Arc<dyn RevocationCache>> {
    let url = url.ok_or_else(|| {
        AuthError::invalid_config("revocation.cache.url", "the redis backend requires a url")
    })?;
    Ok(Arc::new(warden_revocation::RedisRevocationCache::new(url)?))
}

#[cfg(not(feature = "redis"))]
fn redis_cache(_url: Option<&str>) -> AuthResult<Arc<dyn RevocationCache>> {
    Err(AuthError::invalid_config(
        "revocation.cache.backend",
        "the redis backend requires the `redis` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_config::SourceSection;
    use warden_core::FixedClock;

    const NOW: i64 = 1_700_000_000;

    fn config() -> Config {
        Config {
            sources: vec![
                SourceSection {
                    name: "primary".into(),
                    issuer: "svc".into(),
                    audience: "api".into(),
                    secret: "p".repeat(32),
                },
                SourceSection {
                    name: "partner".into(),
                    issuer: "idp".into(),
                    audience: "api".into(),
                    secret: "q".repeat(32),
                },
            ],
            ..Config::default()
        }
    }

    fn warden(config: &Config) -> (Warden, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        (Warden::from_config(config, clock.clone()).unwrap(), clock)
    }

    #[tokio::test]
    async fn test_issue_verify_revoke() {
        let (warden, _) = warden(&config());
        let issued = warden.issue("u1", Some(Role::new("parent")), Map::new()).unwrap();
        assert_eq!(issued.expires_at.unix(), NOW.saturating_add(3_600));

        let principal = warden.verify(&issued.token, None).await.unwrap();
        assert_eq!(principal.subject, "u1");
        assert_eq!(principal.source, "primary");

        assert!(warden.revoke_token(&issued.token, Some("logout")).await.unwrap());
        assert!(!warden.revoke_token(&issued.token, None).await.unwrap());
        assert!(warden.is_revoked(&issued.key).await.unwrap());
        assert_eq!(
            warden.verify(&issued.token, None).await,
            Err(RejectReason::Revoked)
        );
    }

    #[tokio::test]
    async fn test_revoke_rejects_untrusted_token() {
        let (warden, _) = warden(&config());
        let err = warden.revoke_token("a.b.c", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Token(_)));
    }

    #[tokio::test]
    async fn test_revoke_accepts_expired_token() {
        let (warden, clock) = warden(&config());
        let issued = warden.issue("u1", None, Map::new()).unwrap();
        clock.advance_secs(7_200);
        assert!(warden.revoke_token(&issued.token, None).await.unwrap());
    }

    #[test]
    fn test_unknown_primary_rejected() {
        let mut config = config();
        config.tokens.primary_source = "nobody".into();
        let clock = Arc::new(FixedClock::at_unix(NOW));
        assert!(matches!(
            Warden::from_config(&config, clock),
            Err(AuthError::InvalidConfig { .. })
        ));
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_redis_backend_needs_feature() {
        let mut config = config();
        config.revocation.cache.backend = "redis".into();
        config.revocation.cache.url = Some("redis://127.0.0.1:6379".into());
        let clock = Arc::new(FixedClock::at_unix(NOW));
        assert!(matches!(
            Warden::from_config(&config, clock),
            Err(AuthError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_kv_store_starts_cold_and_persists_audit() {
        let mut config = config();
        config.revocation.store.backend = "kv".into();
        config.audit.persist = true;
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let warden = Warden::from_config_with_kv(&config, clock, kv.clone()).unwrap();

        assert!(!warden.checker().is_cache_coherent());
        assert!(warden.checker().confirms_misses());
        let issued = warden.issue("u1", None, Map::new()).unwrap();
        warden.verify(&issued.token, None).await.unwrap();

        let audit = KvAuditSink::new(kv).unwrap();
        assert_eq!(audit.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_health_with_memory_tiers() {
        let (warden, _) = warden(&config());
        let health = warden.health().await;
        assert!(health.is_serving());
        assert!(health.cache.is_healthy());
    }

    #[test]
    fn test_from_config_refuses_durable_backends() {
        let clock = Arc::new(FixedClock::at_unix(NOW));

        let mut kv_store = config();
        kv_store.revocation.store.backend = "kv".into();
        let err = Warden::from_config(&kv_store, clock.clone()).unwrap_err();
        assert!(
            matches!(err, AuthError::InvalidConfig { ref field, .. } if field == "revocation.store.backend")
        );

        let mut persisted = config();
        persisted.audit.persist = true;
        let err = Warden::from_config(&persisted, clock).unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig { ref field, .. } if field == "audit.persist"));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_wiring() {
        let clock = Arc::new(FixedClock::at_unix(NOW));

        let mut zero_interval = config();
        zero_interval.revocation.janitor_interval_secs = 0;
        let err = Warden::from_config(&zero_interval, clock.clone()).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidConfig { ref field, .. } if field == "revocation.janitor_interval_secs"
        ));

        let mut zero_timeout = config();
        zero_timeout.revocation.store.timeout_ms = 0;
        let err = Warden::from_config(&zero_timeout, clock.clone()).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidConfig { ref field, .. } if field == "revocation.store.timeout_ms"
        ));

        let mut short_secret = config();
        short_secret.sources[1].secret = "short".into();
        let err = Warden::from_config(&short_secret, clock).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidConfig { ref field, .. } if field == "sources[1].secret"
        ));
    }

    #[test]
    fn test_memory_store_trusts_cache_misses() {
        let (warden, _) = warden(&config());
        assert!(warden.checker().is_cache_coherent());
        assert!(!warden.checker().confirms_misses());
    }
}
