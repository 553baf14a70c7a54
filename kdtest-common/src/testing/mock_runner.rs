//! Instrumented [`ProcessRunner`] for engine tests.
//!
//! Records every call and answers from a script instead of running `make`.
//! Each call also writes a line into the output sink so that temporary logs
//! have content to archive.

use crate::result::{ExitCode, ResultCode};
use crate::role::Role;
use crate::runner::{OutputSink, ProcessRunner, SetupError};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One recorded runner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Clean(Role),
    Build(Role),
    Install(Role),
    Execute(PathBuf),
    Uninstall(Role),
    SecureDirectory(PathBuf),
}

#[derive(Debug, Default)]
pub struct MockRunner {
    failing_builds: HashSet<Role>,
    failing_installs: HashSet<Role>,
    exec_results: RefCell<VecDeque<ResultCode>>,
    default_exec_result: Option<ResultCode>,
    secure_fails: bool,
    calls: RefCell<Vec<MockCall>>,
}

impl MockRunner {
    /// A runner where everything succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MockRunnerBuilder {
        MockRunnerBuilder::default()
    }

    /// All calls in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &MockCall) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn executions(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, MockCall::Execute(_)))
            .count()
    }

    fn record(&self, call: MockCall, sink: Option<&mut OutputSink>) {
        if let Some(sink) = sink {
            let _ = writeln!(sink, "mock: {call:?}");
        }
        self.calls.borrow_mut().push(call);
    }
}

impl ProcessRunner for MockRunner {
    fn clean(&self, role: Role, _working_dir: &Path, sink: &mut OutputSink) {
        self.record(MockCall::Clean(role), Some(sink));
    }

    fn build(
        &self,
        role: Role,
        _working_dir: &Path,
        _target_path: &Path,
        _args: &[String],
        sink: &mut OutputSink,
    ) -> bool {
        self.record(MockCall::Build(role), Some(sink));
        !self.failing_builds.contains(&role)
    }

    fn install(
        &self,
        role: Role,
        _working_dir: &Path,
        _args: &[String],
        _install_var: &str,
        sink: &mut OutputSink,
    ) -> bool {
        self.record(MockCall::Install(role), Some(sink));
        !self.failing_installs.contains(&role)
    }

    fn execute(&self, executable: &Path, _args: &[String], sink: &mut OutputSink) -> ResultCode {
        self.record(MockCall::Execute(executable.to_path_buf()), Some(sink));
        self.exec_results
            .borrow_mut()
            .pop_front()
            .or(self.default_exec_result)
            .unwrap_or(ResultCode::Exit(ExitCode::Success))
    }

    fn uninstall(
        &self,
        role: Role,
        _working_dir: &Path,
        _install_var: &str,
        _artifact_path: &Path,
        sink: &mut OutputSink,
    ) {
        self.record(MockCall::Uninstall(role), Some(sink));
    }

    fn secure_directory(&self, dir: &Path) -> Result<(), SetupError> {
        self.record(MockCall::SecureDirectory(dir.to_path_buf()), None);
        if self.secure_fails {
            Err(SetupError::Privileged {
                command: format!("chown root:root {}", dir.display()),
                status: "exit status: 1".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct MockRunnerBuilder {
    runner: MockRunner,
}

impl MockRunnerBuilder {
    /// Builds of `role` leave no artifact.
    pub fn fail_build(mut self, role: Role) -> Self {
        self.runner.failing_builds.insert(role);
        self
    }

    /// Installs of `role` do not update the installed file.
    pub fn fail_install(mut self, role: Role) -> Self {
        self.runner.failing_installs.insert(role);
        self
    }

    /// Result of every execution not covered by [`Self::exec_sequence`].
    pub fn exec_result(mut self, code: impl Into<ResultCode>) -> Self {
        self.runner.default_exec_result = Some(code.into());
        self
    }

    /// Results for the first executions, in order.
    pub fn exec_sequence<I>(self, codes: I) -> Self
    where
        I: IntoIterator<Item = ResultCode>,
    {
        self.runner.exec_results.borrow_mut().extend(codes);
        self
    }

    /// Securing a directory fails.
    pub fn fail_secure_directory(mut self) -> Self {
        self.runner.secure_fails = true;
        self
    }

    pub fn build(self) -> MockRunner {
        self.runner
    }
}
