//! Configuration types for Warden.
//!
//! These types carry no dependency on other Warden crates; constructors in
//! `warden-auth` convert them into runtime components. Every section
//! implements [`Default`] with the values in `defaults.toml`, so a bare
//! `[section]` header yields a working section.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Prefix marking a base64-encoded secret.
pub const BASE64_SECRET_PREFIX: &str = "base64:";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Immutable once loaded; pass it explicitly to constructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token issuance settings.
    pub tokens: TokensSection,
    /// Trusted token sources, tried in declaration order.
    pub sources: Vec<SourceSection>,
    /// Revocation tiers.
    pub revocation: RevocationSection,
    /// Audit sinks.
    pub audit: AuditSection,
    /// Logging level, format and directives.
    pub logging: LoggingSection,
}

impl Config {
    /// Look up a trusted source by name.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceSection> {
        self.sources.iter().find(|s| s.name == name)
    }
}

// ---------------------------------------------------------------------------
// TokensSection
// ---------------------------------------------------------------------------

/// Token issuance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensSection {
    /// Lifetime given to tokens issued without an explicit TTL.
    pub default_ttl_secs: u64,
    /// Name of the source whose issuer, audience and key are used to issue.
    pub primary_source: String,
}

impl Default for TokensSection {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            primary_source: "primary".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceSection
// ---------------------------------------------------------------------------

/// One trusted token source: an issuer/audience pair and its HMAC secret.
///
/// `secret` is raw text, or `base64:<data>` for binary keys. It is redacted
/// in `Debug` and never serialized.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Unique name, reported as the principal's source.
    pub name: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// HMAC signing secret.
    pub secret: String,
}

impl SourceSection {
    /// Decode the configured secret into key bytes.
    ///
    /// # Errors
    ///
    /// Returns a message if a `base64:` secret does not decode.
    pub fn secret_bytes(&self) -> Result<Zeroizing<Vec<u8>>, String> {
        decode_secret(&self.secret)
    }
}

/// Decode a secret string: `base64:<data>` is decoded, anything else is
/// taken as its UTF-8 bytes. The result is wiped on drop.
///
/// # Errors
///
/// Returns a message if the base64 payload is invalid.
pub fn decode_secret(raw: &str) -> Result<Zeroizing<Vec<u8>>, String> {
    match raw.strip_prefix(BASE64_SECRET_PREFIX) {
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map(Zeroizing::new)
            .map_err(|e| format!("invalid base64 secret: {e}")),
        None => Ok(Zeroizing::new(raw.as_bytes().to_vec())),
    }
}

impl std::fmt::Debug for SourceSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSection")
            .field("name", &self.name)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("secret", &"***")
            .finish()
    }
}

impl Serialize for SourceSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SourceSection", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("issuer", &self.issuer)?;
        state.serialize_field("audience", &self.audience)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// RevocationSection
// ---------------------------------------------------------------------------

/// Revocation cache, store and maintenance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevocationSection {
    /// Fast cache tier.
    pub cache: CacheSection,
    /// Authoritative store tier.
    pub store: StoreSection,
    /// How often the janitor purges expired records.
    pub janitor_interval_secs: u64,
}

impl Default for RevocationSection {
    fn default() -> Self {
        Self {
            cache: CacheSection::default(),
            store: StoreSection::default(),
            janitor_interval_secs: 300,
        }
    }
}

/// Cache tier settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// `memory`, `redis` or `none`.
    pub backend: String,
    /// Connection URL for the `redis` backend. May embed credentials.
    pub url: Option<String>,
    /// Per-lookup deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            url: None,
            timeout_ms: 50,
        }
    }
}

impl std::fmt::Debug for CacheSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSection")
            .field("backend", &self.backend)
            .field("has_url", &self.url.is_some())
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Serialize for CacheSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CacheSection", 2)?;
        state.serialize_field("backend", &self.backend)?;
        // url is omitted: it may carry credentials.
        state.serialize_field("timeout_ms", &self.timeout_ms)?;
        state.end()
    }
}

/// Store tier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// `memory` (process-local) or `kv` (caller-supplied `KvStore`).
    pub backend: String,
    /// Per-lookup deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            timeout_ms: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Audit sink selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AuditSection {
    /// Emit audit events as structured log lines.
    pub tracing: bool,
    /// Persist audit events through the `KvStore`.
    pub persist: bool,
    /// Record successful verifications and grants, not only failures.
    pub record_successes: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            tracing: true,
            persist: false,
            record_successes: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Per-target directives (e.g. `["warden_revocation=debug"]`).
    pub directives: Vec<String>,
    /// Write rolling log files here instead of stderr.
    pub directory: Option<String>,
    /// File name prefix for rolling log files.
    pub file_prefix: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
            file_prefix: "warden".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceSection {
        SourceSection {
            name: "primary".to_owned(),
            issuer: "svc".to_owned(),
            audience: "api".to_owned(),
            secret: "super-secret-hmac-key-material-0123456789".to_owned(),
        }
    }

    #[test]
    fn test_source_debug_redacts_secret() {
        let debug = format!("{:?}", source());
        assert!(debug.contains("***"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_source_serialize_omits_secret() {
        let toml = toml::to_string(&source()).unwrap();
        assert!(toml.contains("issuer"));
        assert!(!toml.contains("secret"));
    }

    #[test]
    fn test_cache_section_hides_url() {
        let cache = CacheSection {
            backend: "redis".to_owned(),
            url: Some("redis://:hunter2@cache:6379".to_owned()),
            timeout_ms: 50,
        };
        assert!(!format!("{cache:?}").contains("hunter2"));
        assert!(!toml::to_string(&cache).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_decode_secret() {
        assert_eq!(decode_secret("abc").unwrap().as_slice(), b"abc");
        assert_eq!(decode_secret("base64:AAEC").unwrap().as_slice(), [0, 1, 2]);
        assert_eq!(decode_secret("base64: AAEC\n").unwrap().as_slice(), [0, 1, 2]);
        assert!(decode_secret("base64:!!!").is_err());
    }

    #[test]
    fn test_source_lookup() {
        let config = Config {
            sources: vec![source()],
            ..Config::default()
        };
        assert!(config.source("primary").is_some());
        assert!(config.source("partner").is_none());
    }
}
