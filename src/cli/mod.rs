//! CLI module for the regression harness
//!
//! ## Commands
//!
//! - `run <TEST_DIR> --driver <PATH> --driver-input <PATH>` - Run one regression test
//! - `list` - List the suite folders under `test_suites/`
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::HarnessConfig;
use crate::test_case::TestCaseArgs;
use crate::version::REGTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic (help text, cause chain) as a failure.
    pub fn diagnostic(err: impl miette::Diagnostic + Send + Sync + 'static) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Regression test harness for simulation drivers
#[derive(Parser, Debug)]
#[command(name = "regtest")]
#[command(version = REGTEST_VERSION)]
#[command(about = "Run a regression test suite against a simulation driver", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory containing test_suites/ (default: $REGTEST_ROOT or .)
    #[arg(long = "base-dir", value_name = "DIR", global = true)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one regression test
    Run {
        /// Suite folder, or its name under test_suites/
        #[arg(value_name = "TEST_DIR")]
        test_dir: PathBuf,
        /// Simulation driver executable
        #[arg(short = 'd', long, alias = "driver_path", value_name = "PATH")]
        driver: PathBuf,
        /// Input file passed to the driver
        #[arg(short = 'i', long = "driver-input", alias = "driver_input", value_name = "PATH")]
        driver_input: PathBuf,
        /// MPI launcher (e.g. mpiexec); empty runs serially
        #[arg(long, value_name = "CMD", default_value = "")]
        mpirun: String,
        /// Option passed to the MPI launcher (repeatable)
        #[arg(long = "mpirun-opts", alias = "mpirun_opts", value_name = "OPT", allow_hyphen_values = true)]
        mpirun_opts: Vec<String>,
        /// Interpreter for suite scripts (default: $REGTEST_PYTHON or python3)
        #[arg(long, value_name = "INTERP")]
        python: Option<String>,
    },

    /// List the suite folders under test_suites/
    List,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let mut config = HarnessConfig::from_env();
    if let Some(base_dir) = cli.base_dir {
        config = config.with_base_dir(base_dir);
    }

    match cli.command {
        Command::Run {
            test_dir,
            driver,
            driver_input,
            mpirun,
            mpirun_opts,
            python,
        } => {
            if let Some(python) = python {
                config = config.with_python(python);
            }
            let args = TestCaseArgs {
                test_dir,
                driver,
                driver_input,
                mpirun,
                mpirun_opts,
            };
            commands::run_test(&config, args, &commands::builtin_registry())
        }
        Command::List => commands::list_suites(&config),
    }
}

// ============================================================================
// Tests
// ============================================================================
