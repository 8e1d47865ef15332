//! Convenient re-exports for services protected by Warden.
//!
//! ```rust
//! use warden_auth::prelude::*;
//! ```

pub use crate::{
    AccessDecision, AccessDenied, AccessOptions, AllowBasis, AuthError, AuthResult,
    AuthorizationGuard, DenialStatus, GuardedResource, ToResponse, TokenVerifier,
    TransportResponse, TrustedSource, Warden,
};
