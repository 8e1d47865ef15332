//! Convenient re-exports for revocation consumers.
//!
//! ```rust
//! use warden_revocation::prelude::*;
//! ```

pub use crate::{
    CacheLookup, KvRevocationStore, MemoryRevocationCache, MemoryRevocationStore,
    NoopRevocationCache, RevocationCache, RevocationChecker, RevocationError, RevocationHealth,
    RevocationJanitor, RevocationRecord, RevocationResult, RevocationStore, TierStatus,
    TierTimeouts,
};
