//! External process runner.
//!
//! Turns build-tool and executable invocations into taxonomy values. Nothing
//! here returns an error for a failed build, install or spawn: failures come
//! back as `false` or as a [`ResultCode`], and the engine decides what they
//! mean for the step.

use crate::make::{self, BUILD_CONFIGS, MakeTool};
use crate::result::{InitCode, ResultCode};
use crate::role::Role;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while preparing the secured install directory.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed with status {status}")]
    Privileged { command: String, status: String },
}

/// Destination for the combined stdout/stderr of child processes.
#[derive(Debug)]
pub enum OutputSink {
    /// Output is thrown away.
    Discard,
    /// Output is appended to a log file.
    Log { path: PathBuf, file: File },
}

impl OutputSink {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(OutputSink::Log {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn is_logging(&self) -> bool {
        matches!(self, OutputSink::Log { .. })
    }

    /// A handle a child process can write into.
    pub fn stdio(&self) -> Stdio {
        match self {
            OutputSink::Discard => Stdio::null(),
            OutputSink::Log { path, file } => match file.try_clone() {
                Ok(clone) => Stdio::from(clone),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot share log handle; discarding output");
                    Stdio::null()
                }
            },
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Discard => Ok(buf.len()),
            OutputSink::Log { file, .. } => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Discard => Ok(()),
            OutputSink::Log { file, .. } => file.flush(),
        }
    }
}

/// Builds, installs, runs and cleans the executables under test.
pub trait ProcessRunner {
    /// Remove build products of `role` for every build configuration.
    fn clean(&self, role: Role, working_dir: &Path, sink: &mut OutputSink);

    /// Delete the old artifact, run the build, and report whether the
    /// artifact now exists at `target_path`.
    fn build(
        &self,
        role: Role,
        working_dir: &Path,
        target_path: &Path,
        args: &[String],
        sink: &mut OutputSink,
    ) -> bool;

    /// Build and install `role`, succeeding only if the installed file exists
    /// and was modified after the install started.
    fn install(
        &self,
        role: Role,
        working_dir: &Path,
        args: &[String],
        install_var: &str,
        sink: &mut OutputSink,
    ) -> bool;

    /// Run an executable to completion and map its exit status.
    fn execute(&self, executable: &Path, args: &[String], sink: &mut OutputSink) -> ResultCode;

    /// Remove an installed executable. Best effort.
    fn uninstall(
        &self,
        role: Role,
        working_dir: &Path,
        install_var: &str,
        artifact_path: &Path,
        sink: &mut OutputSink,
    );

    /// Restrict a freshly created install directory to its owner.
    fn secure_directory(&self, dir: &Path) -> Result<(), SetupError>;
}

/// [`ProcessRunner`] backed by `make` and real child processes.
#[derive(Debug, Clone)]
pub struct MakeRunner {
    tool: MakeTool,
    exec_dir: PathBuf,
    privilege_prefix: Vec<String>,
}

impl MakeRunner {
    /// Executables are launched from `exec_dir` (the project root).
    pub fn new(tool: MakeTool, exec_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            exec_dir: exec_dir.into(),
            privilege_prefix: vec!["sudo".to_string()],
        }
    }

    /// Command prefix used to gain privileges when securing directories.
    /// An empty prefix runs `chown`/`chmod` directly.
    pub fn with_privilege_prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privilege_prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn tool(&self) -> &MakeTool {
        &self.tool
    }

    fn run_make(&self, working_dir: &Path, args: &[&str], extra: &[String], sink: &OutputSink) {
        let mut cmd = self.tool.command(working_dir);
        cmd.args(args).args(extra);
        make::run_quietly(&mut cmd, sink.stdio(), sink.stdio());
    }

    fn run_privileged(&self, program: &str, args: &[&str]) -> Result<(), SetupError> {
        let mut parts: Vec<&str> = self.privilege_prefix.iter().map(String::as_str).collect();
        parts.push(program);
        parts.extend_from_slice(args);
        let command_line = parts.join(" ");

        let (first, rest) = parts.split_first().ok_or_else(|| SetupError::Privileged {
            command: command_line.clone(),
            status: "empty command".to_string(),
        })?;
        let status = Command::new(first)
            .args(rest)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| SetupError::Privileged {
                command: command_line.clone(),
                status: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(SetupError::Privileged {
                command: command_line,
                status: status.to_string(),
            })
        }
    }
}

impl ProcessRunner for MakeRunner {
    fn clean(&self, role: Role, working_dir: &Path, sink: &mut OutputSink) {
        debug!(%role, dir = %working_dir.display(), "Cleaning target");
        for config in BUILD_CONFIGS {
            let config_arg = format!("{}={config}", make::vars::CONFIG);
            self.run_make(working_dir, &["clean", &config_arg], &[], sink);
        }
    }

    fn build(
        &self,
        role: Role,
        working_dir: &Path,
        target_path: &Path,
        args: &[String],
        sink: &mut OutputSink,
    ) -> bool {
        debug!(%role, target = %target_path.display(), "Building target");
        if let Err(e) = fs::remove_file(target_path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(target = %target_path.display(), error = %e, "Failed to remove previous build");
        }

        self.run_make(working_dir, &[], args, sink);

        if target_path.is_file() {
            debug!(%role, target = %target_path.display(), "Built target");
            true
        } else {
            info!(%role, target = %target_path.display(), "Failed to build target");
            false
        }
    }

    fn install(
        &self,
        role: Role,
        working_dir: &Path,
        args: &[String],
        install_var: &str,
        sink: &mut OutputSink,
    ) -> bool {
        let target = match self.tool.read_var(working_dir, args, install_var) {
            Ok(value) => PathBuf::from(value),
            Err(e) => {
                let _ = writeln!(sink, "install: could not read {install_var}: {e}");
                return false;
            }
        };
        let pre_build_time = SystemTime::now();

        self.run_make(working_dir, &[], args, sink);
        self.run_make(working_dir, &["install"], args, sink);

        if target.as_os_str().is_empty() || !target.is_file() {
            let _ = writeln!(sink, "install: no file installed to path \"{}\"", target.display());
            info!(%role, target = %target.display(), "Install produced no file");
            return false;
        }

        let updated = fs::metadata(&target)
            .and_then(|meta| meta.modified())
            .map(|modified| modified > pre_build_time)
            .unwrap_or(false);
        if !updated {
            let _ = writeln!(
                sink,
                "install: file installed to path \"{}\" was not updated",
                target.display()
            );
            info!(%role, target = %target.display(), "Installed file is stale");
            return false;
        }
        debug!(%role, target = %target.display(), "Installed target");
        true
    }

    fn execute(&self, executable: &Path, args: &[String], sink: &mut OutputSink) -> ResultCode {
        debug!(executable = %executable.display(), ?args, "Running executable");
        let status = Command::new(executable)
            .args(args)
            .current_dir(&self.exec_dir)
            .stdin(Stdio::null())
            .stdout(sink.stdio())
            .stderr(sink.stdio())
            .status();
        match status {
            Ok(status) => {
                let code = ResultCode::from_exit_status(raw_status(status));
                debug!(executable = %executable.display(), %code, "Executable finished");
                code
            }
            Err(e) => {
                warn!(executable = %executable.display(), error = %e, "Failed to launch executable");
                InitCode::ParentRunFailure.into()
            }
        }
    }

    fn uninstall(
        &self,
        role: Role,
        working_dir: &Path,
        install_var: &str,
        artifact_path: &Path,
        sink: &mut OutputSink,
    ) {
        debug!(%role, path = %artifact_path.display(), "Uninstalling target");
        let path_arg = format!("{install_var}={}", artifact_path.display());
        self.run_make(working_dir, &["uninstall", &path_arg], &[], sink);
    }

    fn secure_directory(&self, dir: &Path) -> Result<(), SetupError> {
        let dir_arg = dir.display().to_string();
        self.run_privileged("chown", &["root:root", &dir_arg])?;
        self.run_privileged("chmod", &["o-w", &dir_arg])
    }
}

/// Exit status as an integer; processes killed by a signal report the
/// negated signal number.
fn raw_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_sink_swallows_writes() {
        let mut sink = OutputSink::Discard;
        assert_eq!(sink.write(b"ignored").unwrap(), 7);
        assert!(!sink.is_logging());
    }

    #[test]
    fn test_log_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "first\n").unwrap();

        let mut sink = OutputSink::append_to(&path).unwrap();
        writeln!(sink, "second").unwrap();
        drop(sink);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_execute_missing_executable_is_run_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MakeRunner::new(MakeTool::default(), dir.path());
        let code = runner.execute(&dir.path().join("missing"), &[], &mut OutputSink::Discard);
        assert_eq!(code, ResultCode::Init(InitCode::ParentRunFailure));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_maps_exit_status() {
        use crate::result::ExitCode;

        let dir = tempfile::tempdir().unwrap();
        let runner = MakeRunner::new(MakeTool::default(), dir.path());
        let sh = Path::new("/bin/sh");
        let run = |script: &str| {
            runner.execute(sh, &["-c".to_string(), script.to_string()], &mut OutputSink::Discard)
        };

        assert_eq!(run("exit 0"), ResultCode::Exit(ExitCode::Success));
        assert_eq!(run("exit 6"), ResultCode::Exit(ExitCode::DaemonParentEnded));
        assert_eq!(run("exit 42"), ResultCode::Unrecognized(42));
        assert_eq!(run("kill -9 $$"), ResultCode::Unrecognized(-9));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_captures_output_in_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("out.txt");
        let runner = MakeRunner::new(MakeTool::default(), dir.path());
        let mut sink = OutputSink::append_to(&log).unwrap();
        runner.execute(
            Path::new("/bin/sh"),
            &["-c".to_string(), "echo out; echo err >&2".to_string()],
            &mut sink,
        );
        drop(sink);

        let content = fs::read_to_string(&log).unwrap();
        assert!(content.contains("out"));
        assert!(content.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_directory_reports_failed_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MakeRunner::new(MakeTool::default(), dir.path())
            .with_privilege_prefix(["/bin/sh", "-c", "exit 3", "sh"]);
        let err = runner.secure_directory(dir.path()).unwrap_err();
        assert!(matches!(err, SetupError::Privileged { .. }));
        assert!(err.to_string().contains("chown"));
    }
}
