//! Suite driver: runs every registered group in order and tallies results.

use crate::config::TestPaths;
use crate::engine::{GroupSummary, HaltRequested, TestGroup};
use crate::make::install_var;
use crate::role::Role;
use crate::runner::{OutputSink, ProcessRunner};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use tracing::{info, warn};

/// Totals for a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub tests: usize,
    pub passed: usize,
    pub groups: Vec<GroupSummary>,
}

impl SuiteSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.tests && self.groups.iter().all(GroupSummary::count_matches)
    }
}

/// An ordered list of test groups sharing one failure log.
pub struct TestSuite<R> {
    paths: TestPaths,
    groups: Vec<TestGroup<R>>,
    out: Box<dyn Write>,
}

impl<R: ProcessRunner> TestSuite<R> {
    pub fn new(paths: TestPaths) -> Self {
        Self {
            paths,
            groups: Vec::new(),
            out: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Register a group. The suite clears the failure log once per run, so
    /// the group stops clearing it itself.
    pub fn add(&mut self, mut group: TestGroup<R>) -> &mut Self {
        group.set_reset_failure_log(false);
        self.groups.push(group);
        self
    }

    pub fn groups(&self) -> &[TestGroup<R>] {
        &self.groups
    }

    /// Total checks declared by every group.
    pub fn declared_tests(&self) -> usize {
        self.groups.iter().map(TestGroup::test_count).sum()
    }

    /// Run every group. Stops early only when a group halts.
    pub fn run(&mut self) -> Result<SuiteSummary, HaltRequested> {
        self.clear_failure_log();

        let declared = self.declared_tests();
        let _ = writeln!(
            self.out,
            "Running {declared} tests in {} categories:",
            self.groups.len()
        );
        info!(tests = declared, groups = self.groups.len(), "Starting test run");

        let mut summaries = Vec::with_capacity(self.groups.len());
        for group in &mut self.groups {
            summaries.push(group.run_all()?);
        }

        let summary = SuiteSummary {
            tests: summaries.iter().map(|g| g.ran).sum(),
            passed: summaries.iter().map(|g| g.passed).sum(),
            groups: summaries,
        };
        let _ = writeln!(self.out, "Passed {} of {} tests.", summary.passed, summary.tests);
        let _ = self.out.flush();
        Ok(summary)
    }

    fn clear_failure_log(&self) {
        let path = self.paths.failure_log_path();
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to clear failure log");
        }
    }
}

/// Remove both installed executables.
pub fn uninstall_targets<R: ProcessRunner>(runner: &R, paths: &TestPaths) {
    for role in Role::pipeline_order() {
        info!(%role, "Uninstalling");
        runner.uninstall(
            role,
            &paths.make_dir(role),
            install_var(role),
            &paths.secure_exe_path(role),
            &mut OutputSink::Discard,
        );
    }
}
