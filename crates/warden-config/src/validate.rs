//! Post-load configuration validation.
//!
//! Checks ranges and cross-field rules on a deserialized [`Config`]. The
//! first violation is returned.

use std::collections::HashSet;

use crate::env::has_unresolved_reference;
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Minimum HMAC secret length in bytes, after decoding.
pub const MIN_SECRET_BYTES: usize = 32;

/// Accepted range for tier timeouts, in milliseconds.
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 1..=10_000;

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

/// Validate a loaded configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_sources(config)?;
    validate_tokens(config)?;
    validate_revocation(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_sources(config: &Config) -> ConfigResult<()> {
    if config.sources.is_empty() {
        return Err(invalid(
            "sources",
            "at least one trusted source must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for (i, source) in config.sources.iter().enumerate() {
        let field = |name: &str| format!("sources[{i}].{name}");

        if source.name.trim().is_empty() {
            return Err(invalid(field("name"), "must not be empty"));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(invalid(
                field("name"),
                format!("duplicate source name '{}'", source.name),
            ));
        }
        if source.issuer.trim().is_empty() {
            return Err(invalid(field("issuer"), "must not be empty"));
        }
        if source.audience.trim().is_empty() {
            return Err(invalid(field("audience"), "must not be empty"));
        }
        if has_unresolved_reference(&source.secret) {
            return Err(invalid(
                field("secret"),
                "contains an unresolved ${VAR} reference",
            ));
        }
        let bytes = source
            .secret_bytes()
            .map_err(|message| invalid(field("secret"), message))?;
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(invalid(
                field("secret"),
                format!(
                    "secret is {} bytes; at least {MIN_SECRET_BYTES} are required",
                    bytes.len()
                ),
            ));
        }
    }
    Ok(())
}

fn validate_tokens(config: &Config) -> ConfigResult<()> {
    let t = &config.tokens;
    if t.default_ttl_secs == 0 {
        return Err(invalid("tokens.default_ttl_secs", "must be greater than 0"));
    }
    if i64::try_from(t.default_ttl_secs).is_err() {
        return Err(invalid("tokens.default_ttl_secs", "is out of range"));
    }
    if config.source(&t.primary_source).is_none() {
        return Err(invalid(
            "tokens.primary_source",
            format!("no trusted source named '{}'", t.primary_source),
        ));
    }
    Ok(())
}

fn validate_revocation(config: &Config) -> ConfigResult<()> {
    let r = &config.revocation;

    match r.cache.backend.as_str() {
        "memory" | "none" => {},
        "redis" => {
            if r.cache.url.as_deref().is_none_or(str::is_empty) {
                return Err(invalid(
                    "revocation.cache.url",
                    "the redis backend requires a url",
                ));
            }
        },
        other => {
            return Err(invalid(
                "revocation.cache.backend",
                format!("unsupported backend '{other}'; expected one of: memory, redis, none"),
            ));
        },
    }

    if !matches!(r.store.backend.as_str(), "memory" | "kv") {
        return Err(invalid(
            "revocation.store.backend",
            format!(
                "unsupported backend '{}'; expected one of: memory, kv",
                r.store.backend
            ),
        ));
    }

    if !TIMEOUT_RANGE_MS.contains(&r.cache.timeout_ms) {
        return Err(invalid(
            "revocation.cache.timeout_ms",
            "must be between 1 and 10000",
        ));
    }
    if !TIMEOUT_RANGE_MS.contains(&r.store.timeout_ms) {
        return Err(invalid(
            "revocation.store.timeout_ms",
            "must be between 1 and 10000",
        ));
    }
    if r.janitor_interval_secs == 0 {
        return Err(invalid(
            "revocation.janitor_interval_secs",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }
    Ok(())
}
