//! Shared test harness for integration tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use warden_audit::MemoryAuditSink;
use warden_auth::{TrustedSource, Warden, WardenComponents};
use warden_core::{FixedClock, Role};
use warden_revocation::{
    MemoryRevocationCache, MemoryRevocationStore, RevocationCache, RevocationChecker,
    RevocationStore,
};
use warden_test::{partner_source_section, test_clock, test_source_section};
use warden_token::{IssueRequest, IssuedToken};

/// A `Warden` over chosen revocation tiers, auditing into memory.
#[allow(dead_code)]
pub struct Harness {
    /// The facade under test.
    pub warden: Warden,
    /// Every audit event emitted so far.
    pub audit: Arc<MemoryAuditSink>,
    /// The clock shared by codecs and the checker.
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl Harness {
    /// Primary and partner sources over in-memory tiers.
    pub fn new() -> Self {
        Self::with_tiers(
            Arc::new(MemoryRevocationCache::new()),
            Arc::new(MemoryRevocationStore::new()),
        )
    }

    /// Primary and partner sources over the given tiers.
    pub fn with_tiers(cache: Arc<dyn RevocationCache>, store: Arc<dyn RevocationStore>) -> Self {
        Self::build(cache, store, false)
    }

    /// Like [`with_tiers`](Self::with_tiers), with the cache untrusted until
    /// the first resync.
    pub fn with_cold_tiers(
        cache: Arc<dyn RevocationCache>,
        store: Arc<dyn RevocationStore>,
    ) -> Self {
        Self::build(cache, store, true)
    }

    fn build(
        cache: Arc<dyn RevocationCache>,
        store: Arc<dyn RevocationStore>,
        cold: bool,
    ) -> Self {
        warden_test::init_test_logging();
        let clock = test_clock();
        let audit = Arc::new(MemoryAuditSink::new());

        let sources = [test_source_section(), partner_source_section()]
            .iter()
            .map(|section| TrustedSource::from_config(section, clock.clone()).unwrap())
            .collect();

        let mut checker =
            RevocationChecker::new(cache, store, clock.clone()).with_audit(audit.clone());
        if cold {
            checker = checker.with_cold_cache();
        }

        let warden = Warden::with_components(WardenComponents {
            sources,
            primary_source: "primary".to_string(),
            checker: Arc::new(checker),
            audit: audit.clone(),
            clock: clock.clone(),
            default_ttl: Duration::from_secs(3_600),
            janitor_interval: Duration::from_secs(300),
            record_successes: true,
        })
        .unwrap();

        Self {
            warden,
            audit,
            clock,
        }
    }

    /// Issue a primary-source token for `subject`.
    pub fn issue(&self, subject: &str) -> IssuedToken {
        self.warden.issue(subject, None, Map::new()).unwrap()
    }

    /// Issue a primary-source token carrying `role`.
    pub fn issue_with_role(&self, subject: &str, role: &str) -> IssuedToken {
        self.warden
            .issue(subject, Some(Role::new(role)), Map::new())
            .unwrap()
    }

    /// Sign a token with the partner source's key and claims.
    pub fn issue_partner(&self, subject: &str) -> IssuedToken {
        let partner = self.warden.verifier().source("partner").unwrap();
        let request = IssueRequest::new(
            subject,
            partner.issuer.as_str(),
            partner.audience.as_str(),
            Duration::from_secs(600),
        );
        partner.codec.issue(&request).unwrap()
    }

    /// Number of audit events with the given name.
    pub fn audited(&self, name: &str) -> usize {
        self.audit.events_named(name).len()
    }
}

/// Flip the first character of the signature segment.
#[allow(dead_code)]
pub fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let mut chars = signature.chars();
    let first = chars.next().unwrap();
    let replacement = if first == 'A' { 'B' } else { 'A' };
    format!("{signed}.{replacement}{}", chars.as_str())
}
