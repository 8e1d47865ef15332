//! Injectable time source.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::types::Timestamp;

/// Source of "now" for validity decisions.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A manually driven clock with one-second resolution.
#[derive(Debug)]
pub struct FixedClock {
    unix_secs: AtomicI64,
}

impl FixedClock {
    /// Create a clock frozen at the given Unix time.
    #[must_use]
    pub fn at_unix(secs: i64) -> Self {
        Self {
            unix_secs: AtomicI64::new(secs),
        }
    }

    /// Create a clock frozen at the current wall-clock second.
    #[must_use]
    pub fn frozen_now() -> Self {
        Self::at_unix(Timestamp::now().unix())
    }

    /// Move the clock to an absolute Unix time.
    pub fn set_unix(&self, secs: i64) {
        self.unix_secs.store(secs, Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, for negative values).
    pub fn advance_secs(&self, secs: i64) {
        let current = self.unix_secs.load(Ordering::SeqCst);
        self.unix_secs
            .store(current.saturating_add(secs), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let secs = self.unix_secs.load(Ordering::SeqCst);
        Timestamp::from_unix(secs).unwrap_or_else(Timestamp::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_unix(100);
        assert_eq!(clock.now().unix(), 100);
        clock.advance_secs(50);
        assert_eq!(clock.now().unix(), 150);
        clock.set_unix(10);
        assert_eq!(clock.now().unix(), 10);
    }

    #[test]
    fn test_system_clock_moves() {
        let clock = SystemClock;
        assert!(clock.now().unix() > 1_600_000_000);
    }
}
