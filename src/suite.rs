//! Suite implementations and the registry that resolves them by name.
//!
//! A suite provides the two phases of a regression test: `run`, which drives
//! the simulation and writes into `parameters.output_path`, and `analyze`,
//! which inspects that output and returns the pass/fail verdict.
//!
//! Suites are registered explicitly under their folder name. Names with no
//! registered suite fall back to the on-disk script (see [`crate::script`]).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::parameters::Parameters;

/// Error returned by a suite phase.
pub type SuiteError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a suite phase.
pub type SuiteResult<T> = Result<T, SuiteError>;

/// The `run`/`analyze` pair every regression test provides.
pub trait Suite {
    /// Execute the simulation for this test.
    fn run(&self, parameters: &Parameters) -> SuiteResult<()>;

    /// Inspect the output of [`Suite::run`] and decide pass (`true`) or fail.
    fn analyze(&self, parameters: &Parameters) -> SuiteResult<bool>;
}

/// Adapter turning a pair of closures into a [`Suite`].
pub struct FnSuite<R, A> {
    run: R,
    analyze: A,
}

impl<R, A> FnSuite<R, A>
where
    R: Fn(&Parameters) -> SuiteResult<()>,
    A: Fn(&Parameters) -> SuiteResult<bool>,
{
    pub fn new(run: R, analyze: A) -> Self {
        Self { run, analyze }
    }
}

impl<R, A> Suite for FnSuite<R, A>
where
    R: Fn(&Parameters) -> SuiteResult<()>,
    A: Fn(&Parameters) -> SuiteResult<bool>,
{
    fn run(&self, parameters: &Parameters) -> SuiteResult<()> {
        (self.run)(parameters)
    }

    fn analyze(&self, parameters: &Parameters) -> SuiteResult<bool> {
        (self.analyze)(parameters)
    }
}

/// Name → suite lookup table.
#[derive(Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<String, Box<dyn Suite>>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `suite` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, suite: impl Suite + 'static) {
        let name = name.into();
        if self.suites.insert(name.clone(), Box::new(suite)).is_some() {
            tracing::debug!(suite = %name, "replaced registered suite");
        }
    }

    /// Builder-style [`SuiteRegistry::register`].
    pub fn with(mut self, name: impl Into<String>, suite: impl Suite + 'static) -> Self {
        self.register(name, suite);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Suite> {
        self.suites.get(name).map(|s| s.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.suites.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.suites.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

impl fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRegistry").field("suites", &self.names()).finish()
    }
}

/// Every folder name directly under the suites root, sorted.
///
/// A missing or unreadable root yields an empty list; this only feeds
/// diagnostics.
pub fn known_suite_folders(suites_root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(suites_root) else {
        return Vec::new();
    };

    let mut folders: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    folders.sort();
    folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn params() -> Parameters {
        Parameters {
            driver_path: PathBuf::from("/bin/driver"),
            driver_input_path: PathBuf::from("/in/driver.in"),
            test_path: PathBuf::from("/suites/a"),
            output_path: PathBuf::from("/suites/a/output"),
            mpi_cmd: String::new(),
            mpi_opts: Vec::new(),
        }
    }

    #[test]
    fn test_fn_suite_dispatches_both_phases() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let suite = FnSuite::new(
            move |_: &Parameters| {
                counter.set(counter.get() + 1);
                Ok(())
            },
            |p: &Parameters| Ok(p.mpi_cmd.is_empty()),
        );

        suite.run(&params()).unwrap();
        assert_eq!(runs.get(), 1);
        assert!(suite.analyze(&params()).unwrap());
    }

    #[test]
    fn test_registry_lookup_and_names() {
        let registry = SuiteRegistry::new()
            .with("zeta", FnSuite::new(|_: &Parameters| Ok(()), |_: &Parameters| Ok(true)))
            .with("alpha", FnSuite::new(|_: &Parameters| Ok(()), |_: &Parameters| Ok(false)));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("alpha"));
        assert!(!registry.contains("beta"));
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert!(!registry.get("alpha").unwrap().analyze(&params()).unwrap());
    }

    #[test]
    fn test_register_replaces_existing_entry() {
        let mut registry = SuiteRegistry::new();
        registry.register("a", FnSuite::new(|_: &Parameters| Ok(()), |_: &Parameters| Ok(false)));
        registry.register("a", FnSuite::new(|_: &Parameters| Ok(()), |_: &Parameters| Ok(true)));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").unwrap().analyze(&params()).unwrap());
    }

    #[test]
    fn test_known_suite_folders_lists_every_folder_but_no_files() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("calculate_pi")).unwrap();
        fs::create_dir(root.path().join("advection")).unwrap();
        fs::create_dir(root.path().join(".cache")).unwrap();
        fs::create_dir(root.path().join("__pycache__")).unwrap();
        fs::write(root.path().join("README.md"), "suites").unwrap();

        assert_eq!(
            known_suite_folders(root.path()),
            vec![".cache", "__pycache__", "advection", "calculate_pi"]
        );
    }

    #[test]
    fn test_known_suite_folders_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(known_suite_folders(&root.path().join("test_suites")).is_empty());
    }
}
