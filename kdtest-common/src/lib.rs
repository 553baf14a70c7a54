//! Core of the KeyDaemon test harness.
//!
//! Builds the daemon and its test parent with `make`, installs them into a
//! secured directory, runs them, and compares how they ended against the
//! expected outcome.

pub mod config;
pub mod engine;
pub mod logging;
pub mod make;
pub mod result;
pub mod role;
pub mod runner;
pub mod suite;
pub mod testing;

pub use config::{EnvError, TestOptions, TestPaths};
pub use engine::{GroupSummary, HaltRequested, StepRequest, TestGroup};
pub use make::{BuildArgs, MakeTool};
pub use result::{ExitCode, InitCode, ResultCode, TestResult, describe};
pub use role::Role;
pub use runner::{MakeRunner, OutputSink, ProcessRunner, SetupError};
pub use suite::{SuiteSummary, TestSuite, uninstall_targets};
