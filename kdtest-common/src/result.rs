//! Result taxonomy for KeyDaemon verification steps.
//!
//! Two closed sets of outcome codes exist:
//!
//! | Range | Set        | Meaning                                         |
//! |-------|------------|-------------------------------------------------|
//! | 0-11  | [`ExitCode`] | Exit status reported by the daemon or parent  |
//! | 50-58 | [`InitCode`] | Outcome reached before the executable exited  |
//!
//! The numeric values double as process exit codes (the daemon emits the
//! `ExitCode` values, and the harness exits with the failing code when told
//! to halt on the first failure), so they must never be renumbered.
//!
//! [`ResultCode`] spans both sets plus any raw exit status outside them, and
//! [`TestResult`] pairs an actual code with the expected one.

use crate::role::Role;
use serde::Serialize;
use std::fmt;

/// An outcome reached before the tested executable could exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum InitCode {
    DaemonBuildFailure = 50,
    DaemonInstallFailure = 51,
    DaemonInitSuccess = 52,
    ParentBuildFailure = 53,
    ParentInstallFailure = 54,
    ParentInitSuccess = 55,
    /// The executable could not be spawned at all.
    ParentRunFailure = 56,
    ParentRunSuccess = 57,
    DaemonRunSuccess = 58,
}

impl InitCode {
    const ALL: [InitCode; 9] = [
        InitCode::DaemonBuildFailure,
        InitCode::DaemonInstallFailure,
        InitCode::DaemonInitSuccess,
        InitCode::ParentBuildFailure,
        InitCode::ParentInstallFailure,
        InitCode::ParentInitSuccess,
        InitCode::ParentRunFailure,
        InitCode::ParentRunSuccess,
        InitCode::DaemonRunSuccess,
    ];

    /// Every init code, in numeric order.
    pub const fn all() -> &'static [InitCode] {
        &Self::ALL
    }

    /// Numeric value of the code.
    pub const fn value(&self) -> i32 {
        *self as i32
    }

    /// Look up an init code by numeric value.
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.value() == value)
    }

    /// The code reported when building `role` fails.
    pub const fn build_failure(role: Role) -> Self {
        match role {
            Role::Daemon => InitCode::DaemonBuildFailure,
            Role::Parent => InitCode::ParentBuildFailure,
        }
    }

    /// The code reported when installing `role` fails.
    pub const fn install_failure(role: Role) -> Self {
        match role {
            Role::Daemon => InitCode::DaemonInstallFailure,
            Role::Parent => InitCode::ParentInstallFailure,
        }
    }

    /// The code reported once `role` is built and installed.
    pub const fn init_success(role: Role) -> Self {
        match role {
            Role::Daemon => InitCode::DaemonInitSuccess,
            Role::Parent => InitCode::ParentInitSuccess,
        }
    }

    /// Human-readable description of the code.
    pub const fn description(&self) -> &'static str {
        match self {
            InitCode::DaemonBuildFailure => "Failed to build KeyDaemon program.",
            InitCode::DaemonInstallFailure => "Failed to install KeyDaemon program.",
            InitCode::DaemonInitSuccess => "Built and installed KeyDaemon program.",
            InitCode::ParentBuildFailure => "Failed to build TestParent program.",
            InitCode::ParentInstallFailure => "Failed to install TestParent program.",
            InitCode::ParentInitSuccess => "Built and installed TestParent program.",
            InitCode::ParentRunFailure => "Failed to run TestParent.",
            InitCode::ParentRunSuccess => "Successfully started TestParent.",
            InitCode::DaemonRunSuccess => "Successfully started KeyDaemon.",
        }
    }
}

/// Exit status reported by the daemon (or by the parent on its behalf).
///
/// Mirrors the daemon's own exit-code header; the values must match it
/// bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    BadDaemonPath = 1,
    BadParentPath = 2,
    InsecureDaemonDir = 3,
    InsecureParentDir = 4,
    DaemonAlreadyRunning = 5,
    DaemonParentEnded = 6,
    FdCleanupFailed = 7,
    DaemonExecFailed = 8,
    BadTrackedKeys = 9,
    MissingKeyEventFiles = 10,
    KeyReadersStopped = 11,
}

impl ExitCode {
    const ALL: [ExitCode; 12] = [
        ExitCode::Success,
        ExitCode::BadDaemonPath,
        ExitCode::BadParentPath,
        ExitCode::InsecureDaemonDir,
        ExitCode::InsecureParentDir,
        ExitCode::DaemonAlreadyRunning,
        ExitCode::DaemonParentEnded,
        ExitCode::FdCleanupFailed,
        ExitCode::DaemonExecFailed,
        ExitCode::BadTrackedKeys,
        ExitCode::MissingKeyEventFiles,
        ExitCode::KeyReadersStopped,
    ];

    /// Every exit code, in numeric order.
    pub const fn all() -> &'static [ExitCode] {
        &Self::ALL
    }

    /// Numeric value of the code.
    pub const fn value(&self) -> i32 {
        *self as i32
    }

    /// Look up an exit code by numeric value.
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.value() == value)
    }

    /// Human-readable description of the code.
    pub const fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "KeyDaemon exited normally.",
            ExitCode::BadDaemonPath => "KeyDaemon was not installed at the required path.",
            ExitCode::BadParentPath => "TestParent was not installed at the required path.",
            ExitCode::InsecureDaemonDir => "KeyDaemon was installed in an unsecured directory.",
            ExitCode::InsecureParentDir => "TestParent was installed in an unsecured directory.",
            ExitCode::DaemonAlreadyRunning => "KeyDaemon was running in multiple processes.",
            ExitCode::DaemonParentEnded => "KeyDaemon exited because TestParent stopped running.",
            ExitCode::FdCleanupFailed => {
                "Failed to clear open file table before launching daemon."
            }
            ExitCode::DaemonExecFailed => "Failed to run KeyDaemon executable.",
            ExitCode::BadTrackedKeys => "Invalid tracked key arguments provided.",
            ExitCode::MissingKeyEventFiles => "No keyboard event files found.",
            ExitCode::KeyReadersStopped => "Keyboard event file readers stopped unexpectedly.",
        }
    }
}

/// Any outcome a verification step can produce or expect.
///
/// `Unrecognized` carries an exit status outside [`ExitCode`]; it is kept
/// verbatim so executables reporting newer codes do not break the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Init(InitCode),
    Exit(ExitCode),
    Unrecognized(i32),
}

impl ResultCode {
    /// Map a raw process exit status onto the exit-code set.
    ///
    /// Init codes are never produced here: a child exiting with 52 is an
    /// unrecognized status, not a harness-side outcome.
    pub fn from_exit_status(status: i32) -> Self {
        match ExitCode::from_value(status) {
            Some(code) => ResultCode::Exit(code),
            None => ResultCode::Unrecognized(status),
        }
    }

    /// Numeric value of the code, usable as a process exit status.
    pub const fn value(&self) -> i32 {
        match self {
            ResultCode::Init(code) => code.value(),
            ResultCode::Exit(code) => code.value(),
            ResultCode::Unrecognized(value) => *value,
        }
    }

    /// Human-readable description of the code.
    pub fn description(&self) -> String {
        describe(*self)
    }
}

impl From<InitCode> for ResultCode {
    fn from(code: InitCode) -> Self {
        ResultCode::Init(code)
    }
}

impl From<ExitCode> for ResultCode {
    fn from(code: ExitCode) -> Self {
        ResultCode::Exit(code)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value(), describe(*self))
    }
}

/// Describe any result code.
///
/// Total over both closed sets; anything else gets the fallback
/// `Unknown result code <value>` text.
pub fn describe(code: ResultCode) -> String {
    match code {
        ResultCode::Init(code) => code.description().to_string(),
        ResultCode::Exit(code) => code.description().to_string(),
        ResultCode::Unrecognized(value) => format!("Unknown result code {value}"),
    }
}

/// Actual and expected outcome of one verification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestResult {
    result_code: ResultCode,
    expected_code: ResultCode,
}

impl TestResult {
    pub fn new(result_code: impl Into<ResultCode>, expected_code: impl Into<ResultCode>) -> Self {
        Self {
            result_code: result_code.into(),
            expected_code: expected_code.into(),
        }
    }

    pub fn result_code(&self) -> ResultCode {
        self.result_code
    }

    pub fn expected_code(&self) -> ResultCode {
        self.expected_code
    }

    /// True when the step ended exactly as expected.
    pub fn passed(&self) -> bool {
        self.result_code == self.expected_code
    }

    pub fn result_text(&self) -> String {
        describe(self.result_code)
    }

    pub fn expected_result_text(&self) -> String {
        describe(self.expected_code)
    }
}
