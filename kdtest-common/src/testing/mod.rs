//! Helpers for tests of the harness itself.
//!
//! These are part of the public API so the binary crate's tests can drive
//! the engine without a real build tool.

pub mod buffer;
pub mod log;
pub mod mock_runner;

pub use buffer::SharedBuffer;
pub use log::init_test_logging;
pub use mock_runner::{MockCall, MockRunner, MockRunnerBuilder};
