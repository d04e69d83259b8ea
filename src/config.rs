//! Harness configuration
//!
//! Settings that are not per-test: where the `test_suites` folder lives and
//! which interpreter runs script suites. Values come from defaults, then the
//! environment, then explicit CLI flags (applied by the caller through the
//! `with_*` builders).

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the base directory.
pub const ROOT_ENV: &str = "REGTEST_ROOT";
/// Environment variable overriding the script interpreter.
pub const PYTHON_ENV: &str = "REGTEST_PYTHON";
/// Folder holding one subfolder per suite, relative to the base directory.
pub const SUITES_DIR: &str = "test_suites";
/// Folder created inside each suite for its output.
pub const OUTPUT_DIR: &str = "output";
/// Extension of the per-suite script.
pub const SCRIPT_EXTENSION: &str = "py";

const DEFAULT_PYTHON: &str = "python3";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory containing `test_suites/`
    pub base_dir: PathBuf,
    /// Interpreter used for script suites
    pub python: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `REGTEST_ROOT` / `REGTEST_PYTHON` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = non_empty_var(ROOT_ENV) {
            config.base_dir = PathBuf::from(root);
        }
        if let Some(python) = non_empty_var(PYTHON_ENV) {
            config.python = python;
        }
        config
    }

    /// Set the base directory
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set the script interpreter
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// `<base_dir>/test_suites`
    pub fn suites_root(&self) -> PathBuf {
        self.base_dir.join(SUITES_DIR)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
