//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_token::prelude::*;` to import all essential types.

pub use crate::{TokenError, TokenResult};

pub use crate::{IssueRequest, IssuedToken, ParsedToken, SigningKey, Token, TokenCodec};
