#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Configuration for Warden.
//!
//! A single TOML file describes the trusted token sources, the revocation
//! tiers, audit sinks and logging.
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! let config = Config::load_file(std::path::Path::new("warden.toml")).unwrap();
//! println!("trusting {} source(s)", config.sources.len());
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. Values in the config file (with `${VAR}` references resolved)
//! 2. `WARDEN_*` environment variables, for fields the file leaves unset
//! 3. Embedded defaults (`defaults.toml`)
//!
//! Signing secrets never have defaults. Reference them from the environment
//! (`secret = "${WARDEN_PRIMARY_SECRET}"`) rather than writing them inline.

pub mod prelude;

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Config file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load and validate a config file, using the process environment for
    /// `${VAR}` references and fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Load and validate config text, using the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text does not parse or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::load_str(content, "<inline>", &env::collect_env_vars())
    }
}
