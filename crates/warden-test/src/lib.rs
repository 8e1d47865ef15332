//! Warden Test - Shared test utilities.
//!
//! Failure-injecting revocation tiers and configuration fixtures, used as a
//! dev-dependency across the workspace.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! warden-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_test::{UnreachableCache, test_config};
//!
//! let cache = Arc::new(UnreachableCache);
//! let config = test_config();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod logging;
pub mod mocks;

pub use fixtures::*;
pub use logging::*;
pub use mocks::*;
pub use warden_core::FixedClock;
