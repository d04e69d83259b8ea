//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::config::HarnessConfig;
use crate::suite::{SuiteRegistry, known_suite_folders};
use crate::test_case::{TestCase, TestCaseArgs};

use super::{CliError, CliResult, ExitCode};

/// Suites compiled into the binary. Every other suite runs from its script.
pub fn builtin_registry() -> SuiteRegistry {
    SuiteRegistry::new()
}

/// Validate, clean, run and analyze one test.
///
/// Exit code 0 when the test passes, 1 when it fails or errors.
pub fn run_test(config: &HarnessConfig, args: TestCaseArgs, registry: &SuiteRegistry) -> CliResult<ExitCode> {
    let test_case = TestCase::new(config, args).map_err(CliError::diagnostic)?;

    test_case.clean_output_folder().map_err(|e| {
        CliError::failure(format!(
            "Error preparing output folder {}: {}",
            test_case.parameters().output_path.display(),
            e
        ))
    })?;

    let passed = test_case.run_analyze(registry).map_err(CliError::diagnostic)?;

    if passed {
        println!("\x1b[1;32m{} PASSED\x1b[0m", test_case.name());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("\x1b[1;31m{} FAILED\x1b[0m", test_case.name());
        Ok(ExitCode::FAILURE)
    }
}

/// Print the suite folders found under `test_suites/`.
pub fn list_suites(config: &HarnessConfig) -> CliResult<ExitCode> {
    let root = config.suites_root();
    if !root.is_dir() {
        return Err(CliError::failure(format!("No test_suites folder at {}", root.display())));
    }

    for folder in known_suite_folders(&root) {
        println!("{folder}");
    }
    Ok(ExitCode::SUCCESS)
}
