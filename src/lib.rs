#![forbid(unsafe_code)]
//! Regression test harness for simulation drivers
//!
//! A regression test is a folder `test_suites/<name>/` holding a script
//! `<name>.py` with two functions: `run`, which launches the simulation driver,
//! and `analyze`, which checks its output and returns pass/fail. This crate
//! validates the paths a test needs, prepares its output folder, runs the two
//! phases and reports the verdict.
//!
//! Suites can also be written in Rust by implementing [`Suite`] and
//! registering them in a [`SuiteRegistry`] under the folder name; registered
//! suites take precedence over the script.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod parameters;
pub mod script;
pub mod suite;
pub mod test_case;
pub mod version;

pub use config::HarnessConfig;
pub use driver::{DriverError, DriverInvocation, DriverOutput};
pub use errors::TestCaseError;
pub use parameters::Parameters;
pub use script::{ScriptError, ScriptSuite};
pub use suite::{FnSuite, Suite, SuiteError, SuiteRegistry, SuiteResult};
pub use test_case::{TestCase, TestCaseArgs};
