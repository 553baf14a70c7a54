//! Orchestration engine.
//!
//! A [`TestGroup`] runs one named group of verification steps:
//!
//! 1. **Setup**: clear the stale failure log, make sure the secured install
//!    directory exists and is locked down.
//! 2. **Run**: call the group's step function once; it drives
//!    [`TestGroup::full_test`] and reports each step through
//!    [`TestGroup::check_result`].
//! 3. **Report**: erase the status line, warn if the number of checks does
//!    not match the declared count, print the pass tally.
//!
//! Each step logs build and run output into a temporary log. A passing check
//! deletes it; a failing check appends it to the failure log first.
//!
//! Halting on the first failure is returned as [`HaltRequested`] rather than
//! exiting the process, so only the outermost driver terminates.

pub mod console;

use crate::config::{TestOptions, TestPaths};
use crate::make::{self, install_var};
use crate::result::{ExitCode, InitCode, ResultCode, TestResult};
use crate::role::Role;
use crate::runner::{OutputSink, ProcessRunner, SetupError};
use console::{StatusConsole, result_tag};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A failing check asked the whole run to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("halting after first failure: {code}")]
pub struct HaltRequested {
    pub code: ResultCode,
}

impl HaltRequested {
    /// Process exit status for the halted run.
    pub fn exit_status(&self) -> i32 {
        self.code.value()
    }
}

/// Step function of a group. Returns early with `Err` when a check halts.
pub type StepFn<R> = Rc<dyn Fn(&mut TestGroup<R>) -> Result<(), HaltRequested>>;

/// Counts reported by one completed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub title: String,
    pub declared: usize,
    pub ran: usize,
    pub passed: usize,
}

impl GroupSummary {
    pub fn count_matches(&self) -> bool {
        self.declared == self.ran
    }
}

/// Inputs of one build, install and execute cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    make_args: Vec<String>,
    exec_path: PathBuf,
    expected: ResultCode,
    exec_args: Vec<String>,
    log_output: bool,
}

impl StepRequest {
    /// Expect a normal exit and log output by default.
    pub fn new(make_args: Vec<String>, exec_path: impl Into<PathBuf>) -> Self {
        Self {
            make_args,
            exec_path: exec_path.into(),
            expected: ResultCode::Exit(ExitCode::Success),
            exec_args: Vec::new(),
            log_output: true,
        }
    }

    pub fn expect(mut self, code: impl Into<ResultCode>) -> Self {
        self.expected = code.into();
        self
    }

    pub fn exec_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn log_output(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }
}

/// Runs and reports one named group of verification steps.
pub struct TestGroup<R> {
    title: String,
    steps: StepFn<R>,
    test_count: usize,
    test_index: usize,
    passed_tests: usize,
    reset_failure_log: bool,
    options: TestOptions,
    paths: TestPaths,
    runner: R,
    console: StatusConsole,
}

impl<R: ProcessRunner> TestGroup<R> {
    /// `steps` is expected to call [`Self::check_result`] exactly
    /// `test_count` times.
    pub fn new<F>(
        title: impl Into<String>,
        steps: F,
        test_count: usize,
        options: TestOptions,
        paths: TestPaths,
        runner: R,
    ) -> Self
    where
        F: Fn(&mut TestGroup<R>) -> Result<(), HaltRequested> + 'static,
    {
        let overwrite = !options.verbose;
        Self {
            title: title.into(),
            steps: Rc::new(steps),
            test_count,
            test_index: 0,
            passed_tests: 0,
            reset_failure_log: true,
            options,
            paths,
            runner,
            console: StatusConsole::stdout(overwrite),
        }
    }

    /// Send console output somewhere other than stdout.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.console = StatusConsole::new(Box::new(out), !self.options.verbose);
        self
    }

    /// Leave an existing failure log in place during setup. Used when a
    /// suite clears it once for all of its groups.
    pub fn keep_failure_log(mut self) -> Self {
        self.reset_failure_log = false;
        self
    }

    pub(crate) fn set_reset_failure_log(&mut self, reset: bool) {
        self.reset_failure_log = reset;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn test_count(&self) -> usize {
        self.test_count
    }

    pub fn tests_run(&self) -> usize {
        self.test_index
    }

    pub fn tests_passed(&self) -> usize {
        self.passed_tests
    }

    pub fn options(&self) -> &TestOptions {
        &self.options
    }

    pub fn paths(&self) -> &TestPaths {
        &self.paths
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Set up, run every step, and print the group summary.
    pub fn run_all(&mut self) -> Result<GroupSummary, HaltRequested> {
        self.test_index = 0;
        self.passed_tests = 0;
        self.console.reset();

        self.console.line(format!("- {}", self.title));
        info!(group = %self.title, declared = self.test_count, "Running test group");
        if let Err(e) = self.setup() {
            warn!(group = %self.title, error = %e, "Test setup incomplete");
            self.console.erase_temp();
            self.console.line(format!("  Setup warning: {e}"));
        }

        let steps = Rc::clone(&self.steps);
        let outcome = steps(self);
        self.console.erase_temp();
        outcome?;

        if self.test_index != self.test_count {
            warn!(
                group = %self.title,
                declared = self.test_count,
                ran = self.test_index,
                "Check count does not match declared count"
            );
            self.console.line(format!(
                "  Expected {} tests, but only ran {}",
                self.test_count, self.test_index
            ));
        }
        self.console.line(format!(
            "  Passed {} of {} tests.",
            self.passed_tests, self.test_index
        ));

        Ok(GroupSummary {
            title: self.title.clone(),
            declared: self.test_count,
            ran: self.test_index,
            passed: self.passed_tests,
        })
    }

    /// Prepare the test tree: drop the old failure log and make sure the
    /// secured install directory exists.
    pub fn setup(&mut self) -> Result<(), SetupError> {
        self.print_temp_line("Initial test setup:");

        let failure_log = self.paths.failure_log_path();
        if self.reset_failure_log && failure_log.is_file() {
            fs::remove_file(&failure_log).map_err(|source| SetupError::Io {
                path: failure_log.clone(),
                source,
            })?;
            debug!(path = %failure_log.display(), "Removed old failure log");
        }

        let exec_dir = self.paths.test_exec_dir();
        if !exec_dir.is_dir() {
            fs::create_dir_all(&exec_dir).map_err(|source| SetupError::Io {
                path: exec_dir.clone(),
                source,
            })?;
        }

        let secure_dir = self.paths.secure_exe_dir();
        if !secure_dir.is_dir() {
            fs::create_dir(&secure_dir).map_err(|source| SetupError::Io {
                path: secure_dir.clone(),
                source,
            })?;
            info!(dir = %secure_dir.display(), "Securing new install directory");
            if let Err(e) = self.runner.secure_directory(&secure_dir) {
                // Leave nothing behind so the next setup tries again.
                if let Err(remove) = fs::remove_dir(&secure_dir) {
                    warn!(dir = %secure_dir.display(), error = %remove, "Failed to remove unsecured directory");
                }
                return Err(e);
            }
        }

        let project_dir = self.paths.project_dir();
        if !project_dir.is_dir() {
            return Err(SetupError::Io {
                path: project_dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "project directory missing"),
            });
        }
        Ok(())
    }

    /// Clean, build and install the daemon.
    pub fn daemon_build_install(&mut self, make_args: &[String], log_output: bool) -> InitCode {
        self.build_install(Role::Daemon, make_args, log_output)
    }

    /// Clean, build and install the parent.
    pub fn parent_build_install(&mut self, make_args: &[String], log_output: bool) -> InitCode {
        self.build_install(Role::Parent, make_args, log_output)
    }

    fn build_install(&mut self, role: Role, make_args: &[String], log_output: bool) -> InitCode {
        let mut sink = self.open_output(log_output);
        if sink.is_logging() && self.options.logs_build_args() {
            let title = format!("{} build/install arguments:", role.title());
            if let Err(e) = make::log_build_args(make_args, &mut sink, Some(&title), 2) {
                warn!(%role, error = %e, "Failed to log build arguments");
            }
        }

        let make_dir = self.paths.make_dir(role);

        self.print_temp_line(&format!("Cleaning {}:", role.noun()));
        self.runner.clean(role, &make_dir, &mut sink);

        self.print_temp_line(&format!("Building {}:", role.noun()));
        let build_path = self.paths.build_path(role);
        if !self.runner.build(role, &make_dir, &build_path, make_args, &mut sink) {
            return InitCode::build_failure(role);
        }

        self.print_temp_line(&format!("Installing {}:", role.noun()));
        if !self
            .runner
            .install(role, &make_dir, make_args, install_var(role), &mut sink)
        {
            return InitCode::install_failure(role);
        }
        InitCode::init_success(role)
    }

    /// Run an executable and map how it ended.
    pub fn exec_test(&mut self, exec_path: &Path, args: &[String], log_output: bool) -> ResultCode {
        let mut sink = self.open_output(log_output);
        let name = exec_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| exec_path.display().to_string());
        self.print_temp_line(&format!("Running {name}:"));
        self.runner.execute(exec_path, args, &mut sink)
    }

    /// Build and install the parent, then the daemon, then run the
    /// executable. Stops at the first phase that does not fully succeed and
    /// reports that phase's outcome.
    pub fn full_test(&mut self, request: &StepRequest) -> TestResult {
        let parent = self.parent_build_install(&request.make_args, request.log_output);
        if parent != InitCode::ParentInitSuccess {
            return TestResult::new(parent, request.expected);
        }

        let daemon = self.daemon_build_install(&request.make_args, request.log_output);
        if daemon != InitCode::DaemonInitSuccess {
            return TestResult::new(daemon, request.expected);
        }

        let run = self.exec_test(&request.exec_path, &request.exec_args, request.log_output);
        TestResult::new(run, request.expected)
    }

    /// Report one check.
    ///
    /// Returns `Ok(passed)`, or `Err(HaltRequested)` for a failure when the
    /// run stops at the first failure. The temporary log is archived before
    /// either is returned.
    pub fn check_result(
        &mut self,
        result: &TestResult,
        description: &str,
    ) -> Result<bool, HaltRequested> {
        self.test_index += 1;
        let passed = result.passed();

        let (tag, plain_tag) = result_tag(passed);
        let index_text = format!("  {}/{}: ", self.test_index, self.test_count);
        let margin = " ".repeat(index_text.len() + plain_tag.len() + 2);

        self.console.erase_temp();
        self.console.line(format!("{index_text}{tag}: {description}"));
        self.console
            .line(format!("{margin}Result: {}", result.result_text()));

        let temp_log = self.paths.temp_log_path();
        if passed {
            self.passed_tests += 1;
            remove_if_present(&temp_log);
            debug!(index = self.test_index, description, "Check passed");
            return Ok(true);
        }

        self.console
            .line(format!("{margin}Expected: {}", result.expected_result_text()));
        self.console.line(format!(
            "{margin}See {} for more information.",
            crate::config::paths::FAILURE_LOG_NAME
        ));
        info!(
            index = self.test_index,
            description,
            actual = %result.result_code(),
            expected = %result.expected_code(),
            "Check failed"
        );

        if temp_log.is_file() {
            match self.archive_failure(&temp_log, result, description) {
                Ok(()) => remove_if_present(&temp_log),
                Err(e) => warn!(
                    path = %temp_log.display(),
                    error = %e,
                    "Failed to archive test output; keeping test log"
                ),
            }
        }

        if self.options.exit_on_failure {
            return Err(HaltRequested {
                code: result.result_code(),
            });
        }
        Ok(false)
    }

    /// Best-effort removal of an installed executable.
    pub fn uninstall(&mut self, role: Role) {
        let make_dir = self.paths.make_dir(role);
        let artifact = self.paths.secure_exe_path(role);
        self.runner.uninstall(
            role,
            &make_dir,
            install_var(role),
            &artifact,
            &mut OutputSink::Discard,
        );
    }

    fn archive_failure(
        &self,
        temp_log: &Path,
        result: &TestResult,
        description: &str,
    ) -> io::Result<()> {
        let output = match fs::read(temp_log) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<test output unreadable: {e}>"),
        };
        let mut failure_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.failure_log_path())?;

        let mut block = format!(
            "\n{} {} [{}]\n    {}\nTest output:\n",
            self.test_index,
            description,
            chrono::Utc::now().to_rfc3339(),
            result.result_text()
        );
        for line in output.lines() {
            block.push('\t');
            block.push_str(line);
            block.push('\n');
        }
        failure_log.write_all(block.as_bytes())
    }

    fn open_output(&self, log_output: bool) -> OutputSink {
        if !log_output {
            return OutputSink::Discard;
        }
        let path = self.paths.temp_log_path();
        OutputSink::append_to(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Cannot open test log; discarding output");
            OutputSink::Discard
        })
    }

    fn print_temp_line(&mut self, line: &str) {
        self.console
            .print_temp(format!("  Test {}: {line}", self.test_index + 1));
    }
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove test log");
    }
}
