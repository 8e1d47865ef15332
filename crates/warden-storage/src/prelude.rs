//! Convenient re-exports for storage consumers.
//!
//! ```rust
//! use warden_storage::prelude::*;
//! ```

pub use crate::{KvStore, MemoryKvStore, ScopedKvStore, StorageError, StorageResult};
