//! Shared Tokio runtime for async tests.
//!
//! `#[tokio::test]` creates a runtime per test. When a test finishes, tasks
//! spawned by the app under test may still be shutting down when that runtime
//! is dropped. Running every test on one process-wide runtime lets teardown
//! complete. Use it through the `#[graphql_test]` attribute.

use std::future::Future;

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

/// Global Tokio runtime shared across all tests.
#[allow(clippy::expect_used)]
static TEST_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create test runtime")
});

/// Run an async test body on the shared runtime and return its output.
pub fn run_test<F: Future>(future: F) -> F::Output {
    TEST_RUNTIME.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_test_returns_output() {
        let value = run_test(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_spawned_tasks_complete() {
        let value = run_test(async { tokio::spawn(async { 7 }).await.expect("join") });
        assert_eq!(value, 7);
    }
}
