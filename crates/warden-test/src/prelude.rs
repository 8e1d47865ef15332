//! Convenient re-exports for tests.
//!
//! ```rust
//! use warden_test::prelude::*;
//! ```

pub use crate::{
    CountingStore, FixedClock, SlowCache, SlowStore, UnreachableCache, UnreachableStore,
    WriteFailingCache, init_test_logging, test_clock, test_codec, test_config,
};
