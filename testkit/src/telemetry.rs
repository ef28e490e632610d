//! Tracing setup for tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `warn` with this crate at
/// `info`. Output goes through the test harness writer so it is captured per
/// test. Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,graphql_testkit=info"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
        if installed.is_err() {
            tracing::debug!("Tracing subscriber already installed");
        }
    });
}
