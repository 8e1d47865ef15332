//! Test logging.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Output goes through the test harness writer, so it only shows for
/// failing tests. `RUST_LOG` overrides the default `warden=debug` filter.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=debug"));
        // Another harness may have installed a subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
