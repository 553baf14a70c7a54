//! Registered verification groups, in run order.

pub mod basic_build;

use kdtest_common::{ProcessRunner, TestOptions, TestPaths, TestSuite};

/// Add every group to `suite`. Each group gets its own runner from
/// `runner`.
pub fn register<R, F>(suite: &mut TestSuite<R>, options: &TestOptions, paths: &TestPaths, runner: F)
where
    R: ProcessRunner + 'static,
    F: Fn() -> R,
{
    suite.add(basic_build::basic_build(options, paths, runner()));
}
