//! Shared helpers for siteflow's integration tests.

pub mod builders;
pub mod fake_action;
pub mod fake_backend;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness capture, once per binary.
///
/// Output only shows for failing tests (or with `--nocapture`). Filter with
/// `SITEFLOW_LOG`, e.g. `SITEFLOW_LOG=siteflow::dag=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("SITEFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Fail the test instead of hanging when `f` does not finish within 5 s.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(Duration::from_secs(5), f).await {
        Ok(out) => out,
        Err(_) => panic!("test did not finish within 5 seconds"),
    }
}
