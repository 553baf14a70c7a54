//! Configuration for the KeyDaemon test harness.
//!
//! - Environment variable parsing with type safety (`KDTEST_` prefix)
//! - Test options shared by every verification group
//! - Path and filename layout of the test tree

pub mod env;
pub mod options;
pub mod paths;

pub use env::{EnvError, EnvParser};
pub use options::TestOptions;
pub use paths::TestPaths;

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
