//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Time
pub use crate::{Clock, FixedClock, SystemClock, Timestamp};

// Identity
pub use crate::{Principal, RequestMeta, Role, TokenKey};

// Outcomes
pub use crate::{DenyReason, RejectReason};
