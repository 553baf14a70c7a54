//! `MakeRunner` against a fake build tool.

#![cfg(unix)]

mod common;

use common::{FakeMake, TestTree};
use kdtest_common::make::install_var;
use kdtest_common::{BuildArgs, OutputSink, ProcessRunner, Role};
use std::fs::{self, File};
use std::time::{Duration, SystemTime};

fn args(tree: &TestTree) -> Vec<String> {
    BuildArgs::new(&tree.paths).to_args()
}

fn log_sink(tree: &TestTree) -> OutputSink {
    OutputSink::append_to(&tree.paths.temp_log_path()).unwrap()
}

fn read_log(tree: &TestTree) -> String {
    fs::read_to_string(tree.paths.temp_log_path()).unwrap_or_default()
}

#[test]
fn test_clean_runs_debug_then_release() {
    let tree = TestTree::new(FakeMake::default());
    let runner = tree.runner();
    let mut sink = log_sink(&tree);
    runner.clean(Role::Daemon, &tree.paths.make_dir(Role::Daemon), &mut sink);
    drop(sink);

    let log = read_log(&tree);
    let debug = log.find("clean KD_CONFIG=Debug").unwrap();
    let release = log.find("clean KD_CONFIG=Release").unwrap();
    assert!(debug < release);
}

#[test]
fn test_build_creates_artifact() {
    let tree = TestTree::new(FakeMake::default());
    let runner = tree.runner();
    let target = tree.paths.build_path(Role::Parent);

    let built = runner.build(
        Role::Parent,
        &tree.paths.make_dir(Role::Parent),
        &target,
        &args(&tree),
        &mut OutputSink::Discard,
    );
    assert!(built);
    assert!(target.is_file());
}

#[test]
fn test_build_failure_removes_stale_artifact() {
    let tree = TestTree::new(FakeMake {
        fail_build: Some("TestDaemon"),
        ..FakeMake::default()
    });
    let runner = tree.runner();
    let target = tree.paths.build_path(Role::Daemon);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "left over from an earlier build").unwrap();

    let mut sink = log_sink(&tree);
    let built = runner.build(
        Role::Daemon,
        &tree.paths.make_dir(Role::Daemon),
        &target,
        &args(&tree),
        &mut sink,
    );
    drop(sink);

    assert!(!built);
    assert!(!target.exists());
    assert!(read_log(&tree).contains("compile error in keyd"));
}

#[test]
fn test_install_copies_fresh_file() {
    let tree = TestTree::new(FakeMake::default());
    let runner = tree.runner();
    let role = Role::Daemon;

    let installed = runner.install(
        role,
        &tree.paths.make_dir(role),
        &args(&tree),
        install_var(role),
        &mut OutputSink::Discard,
    );
    assert!(installed);
    assert!(tree.paths.secure_exe_path(role).is_file());
}

#[test]
fn test_install_rejects_file_that_was_not_updated() {
    let tree = TestTree::new(FakeMake {
        skip_install: true,
        ..FakeMake::default()
    });
    let runner = tree.runner();
    let role = Role::Parent;

    let installed_path = tree.paths.secure_exe_path(role);
    fs::create_dir_all(installed_path.parent().unwrap()).unwrap();
    let file = File::create(&installed_path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    drop(file);

    let mut sink = log_sink(&tree);
    let installed = runner.install(
        role,
        &tree.paths.make_dir(role),
        &args(&tree),
        install_var(role),
        &mut sink,
    );
    drop(sink);

    assert!(!installed);
    assert!(read_log(&tree).contains("was not updated"));
}

#[test]
fn test_install_without_file_fails() {
    let tree = TestTree::new(FakeMake {
        skip_install: true,
        ..FakeMake::default()
    });
    let runner = tree.runner();
    let role = Role::Daemon;

    let mut sink = log_sink(&tree);
    let installed = runner.install(
        role,
        &tree.paths.make_dir(role),
        &args(&tree),
        install_var(role),
        &mut sink,
    );
    drop(sink);

    assert!(!installed);
    assert!(read_log(&tree).contains("no file installed to path"));
}

#[test]
fn test_uninstall_removes_installed_file() {
    let tree = TestTree::new(FakeMake::default());
    let runner = tree.runner();
    let role = Role::Parent;
    let installed_path = tree.paths.secure_exe_path(role);
    fs::create_dir_all(installed_path.parent().unwrap()).unwrap();
    fs::write(&installed_path, "installed").unwrap();

    runner.uninstall(
        role,
        &tree.paths.make_dir(role),
        install_var(role),
        &installed_path,
        &mut OutputSink::Discard,
    );
    assert!(!installed_path.exists());
}

#[test]
fn test_read_var_resolves_install_path() {
    let tree = TestTree::new(FakeMake::default());
    let value = tree
        .tool()
        .read_var(
            &tree.paths.make_dir(Role::Daemon),
            &args(&tree),
            install_var(Role::Daemon),
        )
        .unwrap();
    assert_eq!(value, tree.paths.secure_exe_path(Role::Daemon).display().to_string());
}
