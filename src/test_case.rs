//! A single regression test invocation.
//!
//! ## Lifecycle
//!
//! 1. [`TestCase::new`] resolves and validates the suite folder, suite script,
//!    driver and driver input, then builds the [`Parameters`].
//! 2. [`TestCase::clean_output_folder`] recreates `<test_path>/output` empty.
//! 3. [`TestCase::run_analyze`] runs the suite and returns its verdict.
//!
//! The process working directory is never changed. Suites find their output
//! folder through `parameters.output_path` and subprocesses are started inside it.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::config::{HarnessConfig, OUTPUT_DIR, SCRIPT_EXTENSION, SUITES_DIR};
use crate::errors::TestCaseError;
use crate::parameters::Parameters;
use crate::script::ScriptSuite;
use crate::suite::{Suite, SuiteRegistry, known_suite_folders};

/// Raw inputs for one test, usually straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct TestCaseArgs {
    /// Suite folder: a path (relative paths are taken from the base
    /// directory), or a folder name under `test_suites/`
    pub test_dir: PathBuf,
    /// Driver executable
    pub driver: PathBuf,
    /// Driver input file
    pub driver_input: PathBuf,
    /// MPI launcher, empty for serial runs
    pub mpirun: String,
    /// MPI launcher options
    pub mpirun_opts: Vec<String>,
}

/// A validated regression test, ready to run.
#[derive(Debug, Clone)]
pub struct TestCase {
    parameters: Parameters,
    name: String,
    module: String,
    script: PathBuf,
    base_dir: PathBuf,
    python: String,
}

impl TestCase {
    /// Validate `args` against the suites under `config.base_dir`.
    ///
    /// Checks run in order: suite folder, suite script, driver, driver input.
    /// The first failure is returned.
    #[tracing::instrument(skip_all, fields(test_dir = %args.test_dir.display()))]
    pub fn new(config: &HarnessConfig, args: TestCaseArgs) -> Result<Self, TestCaseError> {
        let base_dir = absolute(&config.base_dir);
        let suites_root = base_dir.join(SUITES_DIR);

        let test_path = resolve_test_folder(&args.test_dir, &base_dir, &suites_root)?;
        let name = test_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let script = suites_root.join(&name).join(format!("{name}.{SCRIPT_EXTENSION}"));
        if !script.is_file() {
            return Err(TestCaseError::MissingScript { path: script });
        }
        if !args.driver.is_file() {
            return Err(TestCaseError::MissingDriver { path: args.driver });
        }
        if !args.driver_input.is_file() {
            return Err(TestCaseError::MissingDriverInput {
                path: args.driver_input,
            });
        }

        let parameters = Parameters {
            driver_path: absolute(&args.driver),
            driver_input_path: absolute(&args.driver_input),
            output_path: test_path.join(OUTPUT_DIR),
            test_path,
            mpi_cmd: args.mpirun,
            mpi_opts: args.mpirun_opts,
        };

        let test_case = Self {
            parameters,
            module: module_identifier(&name),
            name,
            script,
            base_dir,
            python: config.python.clone(),
        };
        tracing::info!("{test_case}");
        Ok(test_case)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Dotted identifier of the suite module, `test_suites.<name>.<name>`.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// `test_suites/<name>/<name>.py`
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Remove `<test_path>/output` if present and create it again, empty.
    pub fn clean_output_folder(&self) -> io::Result<()> {
        let output = &self.parameters.output_path;
        if output.is_dir() {
            tracing::debug!(path = %output.display(), "removing previous output");
            fs::remove_dir_all(output)?;
        }
        fs::create_dir(output)
    }

    /// The script-backed suite for this test.
    pub fn script_suite(&self) -> ScriptSuite {
        ScriptSuite::new(&self.python, &self.base_dir, &self.module, &self.script)
    }

    /// Run the suite registered under this test's name, or its script when
    /// none is registered, and return the `analyze` verdict.
    #[tracing::instrument(skip_all, fields(test = %self.name))]
    pub fn run_analyze(&self, registry: &SuiteRegistry) -> Result<bool, TestCaseError> {
        match registry.get(&self.name) {
            Some(suite) => {
                tracing::debug!("using registered suite");
                self.run_suite(suite)
            }
            None => {
                tracing::debug!(script = %self.script.display(), "using suite script");
                self.run_suite(&self.script_suite())
            }
        }
    }

    /// Run `suite` against this test's parameters and return the verdict.
    pub fn run_suite(&self, suite: &dyn Suite) -> Result<bool, TestCaseError> {
        suite.run(&self.parameters).map_err(|source| TestCaseError::Run {
            test: self.name.clone(),
            source,
        })?;

        let passed = suite.analyze(&self.parameters).map_err(|source| TestCaseError::Analyze {
            test: self.name.clone(),
            source,
        })?;

        tracing::info!(passed, "analysis complete");
        Ok(passed)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        writeln!(f, "Using:")?;
        writeln!(f, "driver at:       {}", p.driver_path.display())?;
        writeln!(f, "driver input at: {}", p.driver_input_path.display())?;
        writeln!(f, "test folder:     {}", p.test_path.display())?;
        write!(f, "output sent to:  {}", p.output_path.display())
    }
}

/// `test_suites.<name>.<name>`
pub fn module_identifier(name: &str) -> String {
    format!("{SUITES_DIR}.{name}.{name}")
}

/// `test_dir` as a folder under `base_dir` (absolute paths join as
/// themselves), then as a folder under `suites_root`.
fn resolve_test_folder(test_dir: &Path, base_dir: &Path, suites_root: &Path) -> Result<PathBuf, TestCaseError> {
    let as_path = base_dir.join(test_dir);
    if as_path.is_dir() {
        return Ok(absolute(&as_path));
    }

    let under_root = suites_root.join(test_dir);
    if under_root.is_dir() {
        return Ok(absolute(&under_root));
    }

    Err(TestCaseError::UnknownSuite {
        name: test_dir.display().to_string(),
        looked_in: vec![under_root, as_path],
        known: known_suite_folders(suites_root),
    })
}

/// Lexically absolute and normalized, without touching symlinks.
fn absolute(path: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
