//! Configuration and codec fixtures.

use std::sync::Arc;

use warden_config::{Config, SourceSection};
use warden_core::FixedClock;
use warden_token::{SigningKey, TokenCodec};

/// Fixed instant test clocks start at (2023-11-14T22:13:20Z).
pub const TEST_NOW: i64 = 1_700_000_000;

/// Issuer of the primary test source.
pub const TEST_ISSUER: &str = "svc";
/// Audience of every test source.
pub const TEST_AUDIENCE: &str = "api";
/// Secret of the primary test source.
pub const TEST_SECRET: &str = "test-primary-secret-0123456789abcdef";
/// Issuer of the partner test source.
pub const PARTNER_ISSUER: &str = "partner-idp";
/// Secret of the partner test source.
pub const PARTNER_SECRET: &str = "test-partner-secret-0123456789abcdef";

/// A clock frozen at [`TEST_NOW`].
#[must_use]
pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at_unix(TEST_NOW))
}

/// Primary source section: `svc` / `api`.
#[must_use]
pub fn test_source_section() -> SourceSection {
    SourceSection {
        name: "primary".to_string(),
        issuer: TEST_ISSUER.to_string(),
        audience: TEST_AUDIENCE.to_string(),
        secret: TEST_SECRET.to_string(),
    }
}

/// Partner source section: `partner-idp` / `api`.
#[must_use]
pub fn partner_source_section() -> SourceSection {
    SourceSection {
        name: "partner".to_string(),
        issuer: PARTNER_ISSUER.to_string(),
        audience: TEST_AUDIENCE.to_string(),
        secret: PARTNER_SECRET.to_string(),
    }
}

/// A valid configuration with the primary source only and in-memory tiers.
#[must_use]
pub fn test_config() -> Config {
    Config {
        sources: vec![test_source_section()],
        ..Config::default()
    }
}

/// [`test_config`] plus the partner source.
#[must_use]
pub fn test_config_with_partner() -> Config {
    let mut config = test_config();
    config.sources.push(partner_source_section());
    config
}

/// A codec with the primary test secret on `clock`.
///
/// # Panics
///
/// Never; the test secret satisfies the minimum key length.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_codec(clock: Arc<FixedClock>) -> TokenCodec {
    let key = SigningKey::new(TEST_SECRET.as_bytes().to_vec()).expect("test secret is long enough");
    TokenCodec::new(key, clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_config_is_valid() {
        warden_config::validate::validate(&test_config()).unwrap();
        warden_config::validate::validate(&test_config_with_partner()).unwrap();
    }
}
