//! Warden Auth - Token verification and per-resource authorization.
//!
//! This crate provides:
//! - [`TokenVerifier`]: signature, claims and revocation checks against an
//!   ordered list of [`TrustedSource`]s, producing a [`Principal`](warden_core::Principal)
//!   or a [`RejectReason`](warden_core::RejectReason)
//! - [`AuthorizationGuard`]: role, ownership and delegate rules over any
//!   [`GuardedResource`]
//! - Transport mapping of rejections and denials to generic responses
//! - [`Warden`]: all of the above, plus issuing and revocation, built from
//!   a [`Config`](warden_config::Config)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_auth::prelude::*;
//! use warden_config::Config;
//! use warden_core::SystemClock;
//!
//! # async fn example(config: Config, raw: &str) -> AuthResult<()> {
//! let warden = Warden::from_config(&config, Arc::new(SystemClock))?;
//! match warden.verify(raw, None).await {
//!     Ok(principal) => println!("hello {}", principal.subject),
//!     Err(reason) => println!("{}", reason.to_response().status),
//! }
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

mod error;
mod guard;
mod transport;
mod verifier;
mod warden;

pub use error::{AuthError, AuthResult};
pub use guard::{
    AccessDecision, AccessDenied, AccessOptions, AllowBasis, AuthorizationGuard, GuardedResource,
};
pub use transport::{
    DenialStatus, FORBIDDEN_BODY, NOT_FOUND_BODY, ToResponse, TransportResponse,
    UNAUTHENTICATED_BODY,
};
pub use verifier::{TokenVerifier, TrustedSource, VerificationStage};
pub use warden::{Warden, WardenComponents};
