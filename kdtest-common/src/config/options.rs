//! Options shared by every verification group.

use super::env::{EnvError, EnvParser};

/// Longest daemon timeout accepted from the environment, in seconds.
const MAX_TIMEOUT_SECS: u32 = 86_400;

/// Harness-wide test options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOptions {
    /// Print every status line instead of overwriting a single one, and
    /// build the daemon with verbose output.
    pub verbose: bool,
    /// Build in Release mode instead of Debug.
    pub release: bool,
    /// Seconds the daemon runs before exiting on its own. `None` keeps the
    /// build default.
    pub timeout: Option<u32>,
    /// Stop the whole run at the first failing check.
    pub exit_on_failure: bool,
    /// Whether build arguments go into the test logs. `None` follows
    /// `verbose`.
    pub log_build_args: Option<bool>,
}

impl TestOptions {
    /// Read options from `KDTEST_*` environment variables.
    ///
    /// Invalid values are skipped and returned alongside the options.
    pub fn from_env() -> (Self, Vec<EnvError>) {
        let mut parser = EnvParser::new();
        let options = Self {
            verbose: parser.get_bool("VERBOSE", false),
            release: parser.get_bool("RELEASE", false),
            timeout: parser.get_u32_opt_range("TIMEOUT", 0, MAX_TIMEOUT_SECS),
            exit_on_failure: parser.get_bool("UNTIL_FAILURE", false),
            log_build_args: parser.get_bool_opt("LOG_BUILD_ARGS"),
        };
        (options, parser.take_errors())
    }

    /// Whether the daemon is built in Debug mode.
    pub fn debug_build(&self) -> bool {
        !self.release
    }

    /// Whether build arguments are written to the test logs.
    pub fn logs_build_args(&self) -> bool {
        self.log_build_args.unwrap_or(self.verbose)
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;
    use std::env;

    const VARS: [&str; 5] = [
        "KDTEST_VERBOSE",
        "KDTEST_RELEASE",
        "KDTEST_TIMEOUT",
        "KDTEST_UNTIL_FAILURE",
        "KDTEST_LOG_BUILD_ARGS",
    ];

    fn set_env(key: &str, value: &str) {
        // SAFETY: Tests are serialized via env_test_lock
        unsafe { env::set_var(key, value) };
    }

    fn cleanup_env() {
        for var in VARS {
            // SAFETY: Tests are serialized via env_test_lock
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn test_defaults_without_env() {
        let _guard = env_test_lock();
        cleanup_env();

        let (options, errors) = TestOptions::from_env();
        assert!(errors.is_empty());
        assert_eq!(options, TestOptions::default());
        assert!(options.debug_build());
        assert!(!options.logs_build_args());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = env_test_lock();
        cleanup_env();
        set_env("KDTEST_VERBOSE", "1");
        set_env("KDTEST_RELEASE", "true");
        set_env("KDTEST_TIMEOUT", "3");
        set_env("KDTEST_UNTIL_FAILURE", "yes");

        let (options, errors) = TestOptions::from_env();
        assert!(errors.is_empty());
        assert!(options.verbose);
        assert!(!options.debug_build());
        assert_eq!(options.timeout, Some(3));
        assert!(options.exit_on_failure);
        // Verbose implies build-argument logging unless set explicitly.
        assert!(options.logs_build_args());

        set_env("KDTEST_LOG_BUILD_ARGS", "0");
        let (options, _) = TestOptions::from_env();
        assert!(!options.logs_build_args());

        cleanup_env();
    }

    #[test]
    fn test_invalid_timeout_is_reported() {
        let _guard = env_test_lock();
        cleanup_env();
        set_env("KDTEST_TIMEOUT", "soon");

        let (options, errors) = TestOptions::from_env();
        assert_eq!(options.timeout, None);
        assert_eq!(errors.len(), 1);

        cleanup_env();
    }
}
