//! Path and filename layout of the KeyDaemon test tree.
//!
//! ```text
//! <project>/                 project root (parent of the test root)
//! <project>/Tests/           test root: temp and failure logs
//!   build/                   compiled keyd and TestParent
//!   exec/                    pipe and lock files
//!   exec/secured/            owner-only install directory
//!   TestDaemon/              daemon makefile directory
//!   TestParent/              parent makefile directory
//! ```

use crate::role::Role;
use std::path::{Path, PathBuf};

pub const DAEMON_NAME: &str = "keyd";
pub const PARENT_NAME: &str = "TestParent";
pub const TEMP_LOG_NAME: &str = "tempLog.txt";
pub const FAILURE_LOG_NAME: &str = "failureLog.txt";
pub const PIPE_FILE_NAME: &str = ".keyPipe";
pub const LOCK_FILE_NAME: &str = ".keyLock";

/// Resolved paths for one test tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPaths {
    test_dir: PathBuf,
    project_dir: PathBuf,
}

impl TestPaths {
    /// Lay out the tree under `test_dir`; the project root is its parent.
    ///
    /// A relative `test_dir` is made absolute against the current directory.
    /// Build tools run inside the makefile directories, so every path handed
    /// to them has to be absolute.
    pub fn new(test_dir: impl Into<PathBuf>) -> Self {
        let test_dir = test_dir.into();
        let test_dir = std::path::absolute(&test_dir).unwrap_or(test_dir);
        let project_dir = test_dir
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            test_dir,
            project_dir,
        }
    }

    // Directories

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    pub fn include_dir(&self) -> PathBuf {
        self.project_dir.join("Include")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.test_dir.join("build")
    }

    pub fn test_exec_dir(&self) -> PathBuf {
        self.test_dir.join("exec")
    }

    pub fn secure_exe_dir(&self) -> PathBuf {
        self.test_exec_dir().join("secured")
    }

    pub fn test_daemon_dir(&self) -> PathBuf {
        self.test_dir.join("TestDaemon")
    }

    pub fn test_parent_dir(&self) -> PathBuf {
        self.test_dir.join("TestParent")
    }

    // Per-role paths

    /// Executable file name of `role`.
    pub fn executable_name(&self, role: Role) -> &'static str {
        match role {
            Role::Daemon => DAEMON_NAME,
            Role::Parent => PARENT_NAME,
        }
    }

    /// Directory holding the makefile for `role`.
    pub fn make_dir(&self, role: Role) -> PathBuf {
        match role {
            Role::Daemon => self.test_daemon_dir(),
            Role::Parent => self.test_parent_dir(),
        }
    }

    /// Where `role` lands after compilation.
    pub fn build_path(&self, role: Role) -> PathBuf {
        self.build_dir().join(self.executable_name(role))
    }

    /// Where `role` is installed inside the secured directory.
    pub fn secure_exe_path(&self, role: Role) -> PathBuf {
        self.secure_exe_dir().join(self.executable_name(role))
    }

    // Files

    pub fn pipe_path(&self) -> PathBuf {
        self.test_exec_dir().join(PIPE_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.test_exec_dir().join(LOCK_FILE_NAME)
    }

    pub fn temp_log_path(&self) -> PathBuf {
        self.test_dir.join(TEMP_LOG_NAME)
    }

    pub fn failure_log_path(&self) -> PathBuf {
        self.test_dir.join(FAILURE_LOG_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_test_dir() {
        let paths = TestPaths::new("/work/keyd/Tests");
        assert_eq!(paths.project_dir(), Path::new("/work/keyd"));
        assert_eq!(paths.include_dir(), PathBuf::from("/work/keyd/Include"));
        assert_eq!(
            paths.secure_exe_dir(),
            PathBuf::from("/work/keyd/Tests/exec/secured")
        );
        assert_eq!(
            paths.failure_log_path(),
            PathBuf::from("/work/keyd/Tests/failureLog.txt")
        );
        assert_eq!(
            paths.temp_log_path(),
            PathBuf::from("/work/keyd/Tests/tempLog.txt")
        );
        assert_eq!(paths.lock_path(), PathBuf::from("/work/keyd/Tests/exec/.keyLock"));
    }

    #[test]
    fn test_role_paths() {
        let paths = TestPaths::new("/work/keyd/Tests");
        assert_eq!(
            paths.build_path(Role::Daemon),
            PathBuf::from("/work/keyd/Tests/build/keyd")
        );
        assert_eq!(
            paths.secure_exe_path(Role::Parent),
            PathBuf::from("/work/keyd/Tests/exec/secured/TestParent")
        );
        assert_eq!(
            paths.make_dir(Role::Parent),
            PathBuf::from("/work/keyd/Tests/TestParent")
        );
        assert_eq!(
            paths.make_dir(Role::Daemon),
            PathBuf::from("/work/keyd/Tests/TestDaemon")
        );
    }

    #[test]
    fn test_relative_test_dir_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        for relative in ["Tests", "./Tests"] {
            let paths = TestPaths::new(relative);
            assert_eq!(paths.test_dir(), cwd.join("Tests"));
            assert_eq!(paths.project_dir(), cwd.as_path());
            assert!(paths.secure_exe_path(Role::Parent).is_absolute());
            assert_eq!(paths.build_dir(), cwd.join("Tests/build"));
        }
    }
}
