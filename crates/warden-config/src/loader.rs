//! Config file loading.
//!
//! The load pipeline:
//! 1. Read the file (bounded to [`MAX_CONFIG_FILE_SIZE`]) and parse it
//! 2. Resolve `${VAR}` references
//! 3. Apply `WARDEN_*` env fallbacks for fields the file left unset
//! 4. Merge over the embedded `defaults.toml`
//! 5. Deserialize into [`Config`] and validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted config size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load and validate a config file using the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, is too large,
/// does not parse, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let origin = path.display().to_string();
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: origin.clone(),
        source: e,
    })?;
    check_size(&origin, metadata.len())?;

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: origin.clone(),
        source: e,
    })?;

    load_str(&content, &origin, &collect_env_vars())
}

/// Load and validate config text with an explicit environment.
///
/// `origin` names the source in error messages.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text is too large, does not parse, or
/// fails validation.
pub fn load_str<S: ::std::hash::BuildHasher>(
    content: &str,
    origin: &str,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    check_size(origin, u64::try_from(content.len()).unwrap_or(u64::MAX))?;

    let mut file: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;

    resolve_env_references(&mut file, env_vars);
    let applied = apply_env_fallbacks(&mut file, env_vars);
    if applied > 0 {
        debug!(count = applied, "env var fallbacks applied");
    }

    let mut merged = defaults()?;
    deep_merge(&mut merged, file);

    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;

    validate::validate(&config)?;
    info!(
        origin,
        sources = config.sources.len(),
        cache_backend = %config.revocation.cache.backend,
        "configuration loaded"
    );
    Ok(config)
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn check_size(origin: &str, len: u64) -> ConfigResult<()> {
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: origin.to_owned(),
            message: format!(
                "config is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Overlay `overlay` onto `base`. Tables merge recursively; any other
/// value (arrays included) replaces what was there.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn minimal() -> String {
        format!(
            "[[sources]]\nname = \"primary\"\nissuer = \"svc\"\naudience = \"api\"\nsecret = \"{SECRET}\"\n"
        )
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_match_default_impls() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        let builtin = Config::default();
        assert_eq!(config.tokens, builtin.tokens);
        assert_eq!(config.revocation, builtin.revocation);
        assert_eq!(config.audit, builtin.audit);
        assert_eq!(config.logging, builtin.logging);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_minimal_config_loads_with_defaults() {
        let config = load_str(&minimal(), "<test>", &no_env()).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.tokens.default_ttl_secs, 3600);
        assert_eq!(config.revocation.cache.timeout_ms, 50);
        assert_eq!(config.revocation.store.timeout_ms, 200);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let text = format!("{}\n[revocation.cache]\ntimeout_ms = 20\n", minimal());
        let config = load_str(&text, "<test>", &no_env()).unwrap();
        assert_eq!(config.revocation.cache.timeout_ms, 20);
        assert_eq!(config.revocation.cache.backend, "memory");
    }

    #[test]
    fn test_secret_from_env_reference() {
        let text = "[[sources]]\nname = \"primary\"\nissuer = \"svc\"\naudience = \"api\"\nsecret = \"${PRIMARY_KEY}\"\n";
        let env: HashMap<String, String> =
            [("PRIMARY_KEY".to_owned(), SECRET.to_owned())].into();
        let config = load_str(text, "<test>", &env).unwrap();
        assert_eq!(config.sources[0].secret, SECRET);
    }

    #[test]
    fn test_unresolved_secret_rejected() {
        let text = "[[sources]]\nname = \"primary\"\nissuer = \"svc\"\naudience = \"api\"\nsecret = \"${A_VERY_LONG_MISSING_SECRET_VARIABLE}\"\n";
        let err = load_str(text, "<test>", &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_env_fallback_applies() {
        let env: HashMap<String, String> =
            [("WARDEN_STORE_TIMEOUT_MS".to_owned(), "400".to_owned())].into();
        let config = load_str(&minimal(), "<test>", &env).unwrap();
        assert_eq!(config.revocation.store.timeout_ms, 400);
    }

    #[test]
    fn test_parse_error_reports_origin() {
        let err = load_str("[[sources]\n", "bad.toml", &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { ref path, .. } if path == "bad.toml"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(&path, minimal()).unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.sources[0].issuer, "svc");
    }

    #[test]
    fn test_load_file_missing() {
        let err = load_file(Path::new("/nonexistent/warden.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&path, data).unwrap();

        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
