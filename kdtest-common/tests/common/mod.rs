//! Fixtures for integration tests: a throwaway test tree with a fake `make`.

#![allow(dead_code)]

use kdtest_common::{MakeRunner, MakeTool, Role, TestPaths};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Knobs baked into the fake build tool when it is written.
#[derive(Debug, Clone)]
pub struct FakeMake {
    /// Make directory name whose build leaves no artifact.
    pub fail_build: Option<&'static str>,
    /// `make install` copies nothing.
    pub skip_install: bool,
    /// Exit status of the installed executables.
    pub exit_status: i32,
}

impl Default for FakeMake {
    fn default() -> Self {
        Self {
            fail_build: None,
            skip_install: false,
            exit_status: 0,
        }
    }
}

impl FakeMake {
    fn script(&self) -> String {
        format!(
            r#"#!/bin/sh
dir=$(basename "$PWD")
case "$dir" in
  TestDaemon) name=keyd; path_var=KD_DAEMON_PATH ;;
  *) name=TestParent; path_var=KD_PARENT_PATH ;;
esac

if [ "$1" = "-f" ]; then
  var=${{3#print-}}
  shift 3
  for arg in "$@"; do
    case "$arg" in "$var"=*) echo "${{arg#*=}}" ;; esac
  done
  exit 0
fi

echo "fake make $dir: $*"
case "$1" in
  clean) exit 0 ;;
  uninstall) rm -f "${{2#*=}}"; exit 0 ;;
  install) mode=install; shift ;;
  *) mode=build ;;
esac

target=""
for arg in "$@"; do
  case "$arg" in "$path_var"=*) target=${{arg#*=}} ;; esac
done

if [ "$mode" = build ]; then
  if [ "$dir" = "{fail_build}" ]; then
    echo "compile error in $name" >&2
    exit 2
  fi
  mkdir -p ../build
  printf '#!/bin/sh\necho "%s running"\nexit {exit_status}\n' "$name" > "../build/$name"
  exit 0
fi

if [ "{skip_install}" = "true" ]; then
  exit 0
fi
sleep 1
mkdir -p "$(dirname "$target")"
cp "../build/$name" "$target"
chmod 755 "$target"
"#,
            fail_build = self.fail_build.unwrap_or(""),
            exit_status = self.exit_status,
            skip_install = self.skip_install,
        )
    }
}

/// A temporary project with a `Tests` tree and both makefile directories.
pub struct TestTree {
    _dir: TempDir,
    pub paths: TestPaths,
    pub script: PathBuf,
}

impl TestTree {
    pub fn new(fake: FakeMake) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let test_dir = dir.path().join("Tests");
        let paths = TestPaths::new(&test_dir);
        for role in Role::pipeline_order() {
            fs::create_dir_all(paths.make_dir(role)).expect("create make dir");
        }
        let script = dir.path().join("fake-make.sh");
        fs::write(&script, fake.script()).expect("write fake make");
        Self {
            _dir: dir,
            paths,
            script,
        }
    }

    pub fn tool(&self) -> MakeTool {
        MakeTool::new("sh").with_leading_args([self.script.as_os_str()])
    }

    /// A runner that skips privilege escalation when securing directories.
    pub fn runner(&self) -> MakeRunner {
        MakeRunner::new(self.tool(), self.paths.project_dir()).with_privilege_prefix(["true"])
    }
}
