//! Warden Telemetry - logging and request correlation.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup with multiple formats
//! - Request context carrying the same request ID the audit trail records
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("warden_revocation=debug");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("gateway").with_operation("verify");
//! let _span = ctx.span().entered();
//! tracing::info!("verifying bearer token");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
