//! The single error type raised by a test case.
//!
//! Every failure a [`crate::TestCase`] can hit maps to one `TestCaseError`
//! variant. Failures inside a suite keep the suite's own error as `source()`
//! so the root cause survives while the outward message stays short.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::suite::SuiteError;

/// Failure while preparing or executing a regression test.
#[derive(Debug, Error, Diagnostic)]
pub enum TestCaseError {
    #[error("{}", unknown_suite_message(.name, .looked_in, .known))]
    #[diagnostic(
        code(regtest::unknown_suite),
        help("each regression test must have a folder under test_suites/")
    )]
    UnknownSuite {
        name: String,
        looked_in: Vec<PathBuf>,
        known: Vec<String>,
    },

    #[error("Missing regression test file {}", .path.display())]
    #[diagnostic(
        code(regtest::missing_script),
        help("each test folder must have a python script with the same name as the folder")
    )]
    MissingScript { path: PathBuf },

    #[error("Unable to locate driver {}", .path.display())]
    #[diagnostic(code(regtest::missing_driver))]
    MissingDriver { path: PathBuf },

    #[error("Unable to locate driver input file {}", .path.display())]
    #[diagnostic(code(regtest::missing_driver_input))]
    MissingDriverInput { path: PathBuf },

    #[error("Failed to run driver for test {test}")]
    #[diagnostic(code(regtest::run))]
    Run {
        test: String,
        #[source]
        source: SuiteError,
    },

    #[error("Error in analyzing test criteria for test {test}")]
    #[diagnostic(code(regtest::analyze))]
    Analyze {
        test: String,
        #[source]
        source: SuiteError,
    },
}

fn unknown_suite_message(name: &str, looked_in: &[PathBuf], known: &[String]) -> String {
    let mut msg = format!("Regression test folder is unknown: {name}\nlooked in:");
    for path in looked_in {
        msg.push_str(&format!("\n  {}", path.display()));
    }
    msg.push_str("\nKnown tests folders are:");
    for folder in known {
        msg.push_str(&format!("\n  {folder}"));
    }
    msg
}
