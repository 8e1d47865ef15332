//! Prelude module - commonly used types for convenient import.
//!
//! ```rust,no_run
//! use warden_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! setup_logging(&LogConfig::new("info").with_format(LogFormat::Json))?;
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{FileRotation, LogConfig, LogFormat, LogTarget};

// Setup functions
pub use crate::{setup_default_logging, setup_logging};

// Request context
pub use crate::{RequestContext, RequestGuard};
