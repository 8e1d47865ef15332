//! Warden Core - Foundation types for the authentication and authorization core.
//!
//! This crate provides:
//! - Timestamps and an injectable [`Clock`]
//! - [`TokenKey`], the stable lookup key both revocation tiers are keyed by
//! - [`Principal`] and [`Role`], the verified identity handed to authorization
//! - [`RequestMeta`], caller-supplied request context used for auditing
//! - The closed rejection/denial taxonomy shared by every component
//!
//! This crate has no dependencies on other internal warden crates.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod clock;
mod principal;
mod reason;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use principal::{Principal, RequestMeta, Role};
pub use reason::{DenyReason, RejectReason};
pub use types::{Timestamp, TokenKey};
