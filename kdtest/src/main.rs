//! KeyDaemon test harness.
//!
//! Builds the daemon and its test parent, installs both into a secured
//! directory, runs them, and reports each check against its expected
//! outcome. Failing output is collected in `Tests/failureLog.txt`.

#![forbid(unsafe_code)]

mod groups;

use anyhow::{Context, Result};
use clap::Parser;
use kdtest_common::logging::init_logging;
use kdtest_common::{
    MakeRunner, MakeTool, SuiteSummary, TestOptions, TestPaths, TestSuite, uninstall_targets,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kdtest")]
#[command(author, version, about = "KeyDaemon test harness - build, install and run checks")]
struct Cli {
    /// Print every status line and build the daemon with verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Build in Release mode instead of Debug
    #[arg(short, long)]
    release: bool,

    /// Seconds the daemon runs before exiting
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=86_400))]
    timeout: Option<u32>,

    /// Stop at the first failing check and exit with its code
    #[arg(short, long)]
    until_failure: bool,

    /// Write build arguments into the test logs
    #[arg(short, long)]
    log_build_args: bool,

    /// Uninstall the daemon and parent after the run
    #[arg(long)]
    uninstall: bool,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Test directory; its parent is the project root
    #[arg(long, default_value = "./Tests")]
    test_dir: PathBuf,

    /// Build tool to invoke
    #[arg(long, default_value = "make")]
    make: String,
}

impl Cli {
    /// Flags given on the command line override the environment.
    fn apply(&self, mut options: TestOptions) -> TestOptions {
        options.verbose |= self.verbose;
        options.release |= self.release;
        options.exit_on_failure |= self.until_failure;
        if self.timeout.is_some() {
            options.timeout = self.timeout;
        }
        if self.log_build_args {
            options.log_build_args = Some(true);
        }
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (env_options, env_errors) = TestOptions::from_env();
    let options = cli.apply(env_options);
    init_logging(options.verbose).context("Failed to initialize logging")?;
    for error in &env_errors {
        warn!(%error, "Ignoring invalid environment setting");
    }

    let paths = TestPaths::new(&cli.test_dir);
    let runner = || MakeRunner::new(MakeTool::new(&cli.make), paths.project_dir());
    info!(test_dir = %paths.test_dir().display(), make = %cli.make, "Starting KeyDaemon tests");

    let mut suite = TestSuite::new(paths.clone());
    groups::register(&mut suite, &options, &paths, runner);

    let summary = match suite.run() {
        Ok(summary) => summary,
        Err(halt) => {
            warn!(code = %halt.code, "Stopping after first failure");
            std::process::exit(halt.exit_status());
        }
    };

    if let Some(path) = &cli.summary_json {
        write_summary(path, &summary)?;
    }
    if cli.uninstall {
        uninstall_targets(&runner(), &paths);
    }
    Ok(())
}

fn write_summary(path: &Path, summary: &SuiteSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    info!(path = %path.display(), "Wrote run summary");
    Ok(())
}
