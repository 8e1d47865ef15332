//! Warden Token - signed session tokens.
//!
//! A token is a compact `header.payload.signature` structure signed with
//! HMAC-SHA256. Every token carries `sub`, `iat`, `exp`, `iss` and `aud`,
//! plus an optional `role` and service-specific claims.
//!
//! The [`TokenCodec`] owns one signing key. It:
//! - issues tokens, writing the protected claims after any caller claims
//! - verifies signatures with a pinned algorithm, never the one the header
//!   asks for
//! - validates claims against an expected issuer and audience using an
//!   injected [`Clock`](warden_core::Clock)
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_core::SystemClock;
//! use warden_token::{IssueRequest, SigningKey, TokenCodec};
//!
//! let key = SigningKey::new(b"an-hmac-secret-of-at-least-32-bytes".to_vec()).unwrap();
//! let codec = TokenCodec::new(key, Arc::new(SystemClock));
//!
//! let issued = codec
//!     .issue(&IssueRequest::new("u1", "svc", "api", Duration::from_secs(3600)))
//!     .unwrap();
//! let token = codec.decode(&issued.token, "svc", "api").unwrap();
//! assert_eq!(token.subject, "u1");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod claims;
mod codec;
mod error;
mod key;

pub use claims::{IssueRequest, IssuedToken, PROTECTED_CLAIMS, ParsedToken, Token};
pub use codec::{ALGORITHM, TokenCodec};
pub use error::{TokenError, TokenResult};
pub use key::{MIN_KEY_BYTES, SigningKey};
