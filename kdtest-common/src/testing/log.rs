//! Tracing setup for tests.

use tracing_subscriber::{EnvFilter, fmt};

/// Route tracing output through the test writer. Safe to call repeatedly.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_env("KDTEST_LOG")
        .unwrap_or_else(|_| EnvFilter::new("kdtest=debug,kdtest_common=debug"));
    let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
}
