//! Background maintenance for the revocation tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checker::RevocationChecker;

/// Shortest interval the loop will run at.
pub const MIN_JANITOR_INTERVAL: Duration = Duration::from_secs(1);

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JanitorReport {
    /// Expired store records removed, if the purge succeeded.
    pub purged: Option<usize>,
    /// Records re-mirrored, if a resync was attempted and succeeded.
    pub resynced: Option<usize>,
    /// Expired cache entries dropped, if the cache answered.
    pub evicted: Option<usize>,
}

/// Periodically purges expired store records and, while the cache is
/// incoherent, tries to resync it. Runs off the request path.
#[derive(Debug)]
pub struct RevocationJanitor;

impl RevocationJanitor {
    /// Spawn the maintenance loop. The first pass runs immediately; the
    /// loop exits when `cancel` fires.
    ///
    /// Intervals below [`MIN_JANITOR_INTERVAL`] are raised to it.
    #[must_use]
    pub fn spawn(
        checker: Arc<RevocationChecker>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let interval = if interval < MIN_JANITOR_INTERVAL {
            warn!(
                requested = ?interval,
                "Janitor interval too short, using the minimum"
            );
            MIN_JANITOR_INTERVAL
        } else {
            interval
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Revocation janitor started");

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Revocation janitor stopped");
                        break;
                    },
                    _ = ticker.tick() => {
                        let report = Self::run_once(&checker).await;
                        debug!(
                            purged = ?report.purged,
                            resynced = ?report.resynced,
                            evicted = ?report.evicted,
                            "Janitor pass finished"
                        );
                    },
                }
            }
        })
    }

    /// One maintenance pass.
    pub async fn run_once(checker: &RevocationChecker) -> JanitorReport {
        let purged = match checker.purge_expired().await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Janitor purge failed");
                None
            },
        };

        let resynced = if checker.is_cache_coherent() {
            None
        } else {
            match checker.resync_cache().await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(error = %e, "Janitor resync failed");
                    None
                },
            }
        };

        let evicted = checker.evict_cache().await;

        JanitorReport {
            purged,
            resynced,
            evicted,
        }
    }
}
