//! Environment variable fallbacks and `${VAR}` reference resolution.
//!
//! Env vars are fallbacks, not overrides: they only fill fields the config
//! file left unset. Secrets are normally injected through `${VAR}`
//! references inside the file.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

/// The TOML type an env var value is coerced to.
#[derive(Clone, Copy)]
enum FieldKind {
    Str,
    Int,
    Bool,
}

/// Mapping from an environment variable to a dotted config path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

/// All supported `WARDEN_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_TOKEN_TTL_SECS",
        field_path: "tokens.default_ttl_secs",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "WARDEN_PRIMARY_SOURCE",
        field_path: "tokens.primary_source",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_CACHE_BACKEND",
        field_path: "revocation.cache.backend",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_CACHE_URL",
        field_path: "revocation.cache.url",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_CACHE_TIMEOUT_MS",
        field_path: "revocation.cache.timeout_ms",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "WARDEN_STORE_TIMEOUT_MS",
        field_path: "revocation.store.timeout_ms",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "WARDEN_AUDIT_PERSIST",
        field_path: "audit.persist",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Str,
    },
];

/// Apply env var fallbacks to fields absent from `file`.
///
/// `file` is the parsed config file before defaults are merged in, so
/// "absent" means the operator did not set it. Returns how many were applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    file: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if lookup_path(file, mapping.field_path).is_some() {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let Some(value) = coerce(mapping.kind, val) else {
            debug!(
                var = mapping.var_name,
                "ignoring env var fallback with unparseable value"
            );
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_path(file, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    count
}

/// Resolve `${VAR}` references in every string of the tree.
///
/// Unresolvable references are left in place; validation rejects secrets
/// that still contain one.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Whether a string still holds an unresolved `${VAR}` reference.
#[must_use]
pub fn has_unresolved_reference(s: &str) -> bool {
    s.find("${").is_some_and(|start| s[start..].contains('}'))
}

fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start.saturating_add(2)..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                if let Some(value) = env_vars.get(name) {
                    result.push_str(value);
                } else {
                    debug!(var = name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{name}}}");
                }
                rest = &after[end.saturating_add(1)..];
            },
            _ => {
                // Malformed reference: keep the remainder verbatim.
                result.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    result.push_str(rest);
    result
}

fn coerce(kind: FieldKind, val: &str) -> Option<toml::Value> {
    match kind {
        FieldKind::Str => Some(toml::Value::String(val.to_owned())),
        FieldKind::Int => val.trim().parse::<i64>().ok().map(toml::Value::Integer),
        FieldKind::Bool => val.trim().parse::<bool>().ok().map(toml::Value::Boolean),
    }
}

fn lookup_path<'a>(root: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_table()?.get(segment))
}

fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
