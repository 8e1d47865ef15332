//! Warden Storage - the persistence seam.
//!
//! Warden does not ship a database. Components that need durable state
//! (the revocation store, the audit trail) write through the [`KvStore`]
//! trait, which deployments implement over whatever backend they run.
//!
//! [`MemoryKvStore`] is always available for tests and single-process
//! deployments. [`ScopedKvStore`] pre-binds a namespace and adds typed JSON
//! helpers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};
