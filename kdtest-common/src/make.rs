//! Build-tool glue: makefile variable names, build-argument construction,
//! and the `make` invocation itself.

use crate::config::{TestOptions, TestPaths};
use crate::role::Role;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Makefile variable names understood by the daemon and parent makefiles.
pub mod vars {
    pub const TARGET_APP: &str = "KD_TARGET_APP";
    pub const INSTALL_DIR: &str = "KD_INSTALL_DIR";
    pub const DAEMON_PATH: &str = "KD_DAEMON_PATH";
    pub const PARENT_PATH: &str = "KD_PARENT_PATH";
    pub const PIPE_PATH: &str = "KD_PIPE_PATH";
    pub const LOCK_PATH: &str = "KD_LOCK_PATH";
    pub const KEY_LIMIT: &str = "KD_KEY_LIMIT";
    pub const CONFIG: &str = "KD_CONFIG";
    pub const VERBOSE: &str = "KD_VERBOSE";
    pub const TIMEOUT: &str = "DF_TIMEOUT";
}

/// The makefile variable holding the install path of `role`.
pub const fn install_var(role: Role) -> &'static str {
    match role {
        Role::Daemon => vars::DAEMON_PATH,
        Role::Parent => vars::PARENT_PATH,
    }
}

/// Build configurations cleaned before every build.
pub const BUILD_CONFIGS: [&str; 2] = ["Debug", "Release"];

/// Default number of key codes the daemon tracks.
pub const DEFAULT_KEY_LIMIT: u32 = 239;

/// Default seconds the daemon runs before exiting.
pub const DEFAULT_TIMEOUT_SECS: u32 = 1;

/// The external build utility and any arguments placed before the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeTool {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl Default for MakeTool {
    fn default() -> Self {
        Self::new("make")
    }
}

impl MakeTool {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments passed before every invocation's own arguments
    /// (for example a script path when the program is an interpreter).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// A command running the tool inside `working_dir`.
    pub fn command(&self, working_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).current_dir(working_dir);
        cmd
    }

    /// Ask the makefile in `working_dir` for the resolved value of `var`.
    ///
    /// Runs `make -f Makefile print-<var> <args>` and returns its stdout with
    /// trailing whitespace removed.
    pub fn read_var(&self, working_dir: &Path, args: &[String], var: &str) -> io::Result<String> {
        let output = self
            .command(working_dir)
            .args(["-f", "Makefile"])
            .arg(format!("print-{var}"))
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        let value = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        debug!(var, value = %value, "Read makefile variable");
        Ok(value)
    }
}

/// Values used to build the `NAME=value` argument list for `make`.
///
/// Defaults build, install and run correctly; tests override single fields
/// to provoke specific failures. A field set to `None` is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    pub daemon: Option<String>,
    pub daemon_dir: Option<PathBuf>,
    pub parent_path: Option<PathBuf>,
    pub pipe_path: Option<PathBuf>,
    pub lock_path: Option<PathBuf>,
    pub key_limit: Option<u32>,
    pub timeout: Option<u32>,
    pub debug_build: bool,
    pub verbose: bool,
    pub daemon_path: PathBuf,
}

impl BuildArgs {
    /// Default arguments for the tree described by `paths`.
    pub fn new(paths: &TestPaths) -> Self {
        Self {
            daemon: Some(paths.executable_name(Role::Daemon).to_string()),
            daemon_dir: Some(paths.secure_exe_dir()),
            parent_path: Some(paths.secure_exe_path(Role::Parent)),
            pipe_path: Some(paths.pipe_path()),
            lock_path: Some(paths.lock_path()),
            key_limit: Some(DEFAULT_KEY_LIMIT),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            debug_build: true,
            verbose: true,
            daemon_path: paths.secure_exe_path(Role::Daemon),
        }
    }

    /// Apply the build mode, verbosity and timeout chosen on the command line.
    pub fn with_options(mut self, options: &TestOptions) -> Self {
        self.debug_build = options.debug_build();
        self.verbose = options.verbose;
        if let Some(timeout) = options.timeout {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Render the argument list passed to every `make` invocation.
    pub fn to_args(&self) -> Vec<String> {
        let config = if self.debug_build { "Debug" } else { "Release" };
        let mut args = vec![format!("{}={config}", vars::CONFIG)];

        let optional = [
            (vars::TARGET_APP, self.daemon.clone()),
            (vars::INSTALL_DIR, self.daemon_dir.as_deref().map(display)),
            (vars::PARENT_PATH, self.parent_path.as_deref().map(display)),
            (vars::PIPE_PATH, self.pipe_path.as_deref().map(display)),
            (vars::LOCK_PATH, self.lock_path.as_deref().map(display)),
            (vars::KEY_LIMIT, self.key_limit.map(|n| n.to_string())),
            (vars::TIMEOUT, self.timeout.map(|n| n.to_string())),
        ];
        args.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| format!("{name}={value}"))),
        );

        args.push(format!("{}={}", vars::VERBOSE, if self.verbose { 1 } else { 0 }));
        args.push(format!("{}={}", vars::DAEMON_PATH, display(&self.daemon_path)));
        args
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Write a titled list of build arguments, one `-ARG` per line.
pub fn log_build_args<W: Write>(
    args: &[String],
    out: &mut W,
    title: Option<&str>,
    indent: usize,
) -> io::Result<()> {
    let pad = " ".repeat(indent);
    if let Some(title) = title {
        writeln!(out, "{pad}{title}")?;
    }
    for arg in args {
        writeln!(out, "{pad}-{arg}")?;
    }
    Ok(())
}

/// Run `cmd` with both output streams sent to the given handles, logging
/// spawn failures instead of returning them.
pub(crate) fn run_quietly(cmd: &mut Command, stdout: Stdio, stderr: Stdio) -> Option<i32> {
    let label = format!("{:?}", cmd.get_program());
    match cmd.stdin(Stdio::null()).stdout(stdout).stderr(stderr).status() {
        Ok(status) => {
            debug!(command = %label, code = ?status.code(), "Build tool finished");
            status.code()
        }
        Err(e) => {
            warn!(command = %label, error = %e, "Failed to launch build tool");
            None
        }
    }
}
