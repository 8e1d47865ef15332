//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_config::prelude::*;` to import all essential types.

pub use crate::{ConfigError, ConfigResult};

pub use crate::{
    AuditSection, CacheSection, Config, LoggingSection, RevocationSection, SourceSection,
    StoreSection, TokensSection,
};
