//! Script suites: the `run`/`analyze` pair defined by `test_suites/<name>/<name>.py`.
//!
//! ## Protocol
//!
//! The interpreter is started once per phase with a small bootstrap that puts
//! the base directory on `sys.path`, imports the suite module by its dotted
//! name, builds an attribute object from the JSON in `REGTEST_PARAMETERS`, and
//! calls the phase function.
//!
//! - `run`: exit status 0 is success, anything else is an error.
//! - `analyze`: exit status 0 is a pass, [`ANALYZE_FAILED_EXIT`] is a fail,
//!   anything else (an uncaught exception, a missing function) is an error.
//!
//! The child runs with its working directory set to `parameters.output_path`.
//!
//! ## Output
//!
//! Both streams are captured. Stdout is forwarded line by line at `info`,
//! stderr at `info` on success and at `warn` alongside a fail verdict, so a
//! suite's own explanation of a failed analysis reaches the terminal. When a
//! phase errors, stderr travels in [`ScriptError::Failed`] instead.
//!
//! ## Phases are separate processes
//!
//! `run` and `analyze` each start a fresh interpreter and import the module
//! anew. Module globals assigned during `run` are gone by the time `analyze`
//! runs; suites pass data between phases through files in the output folder.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use thiserror::Error;

use crate::parameters::Parameters;
use crate::suite::{Suite, SuiteResult};

/// Environment variable carrying the JSON-encoded [`Parameters`].
pub const PARAMETERS_ENV: &str = "REGTEST_PARAMETERS";

/// Exit status the bootstrap uses when `analyze` returns a falsy value.
pub const ANALYZE_FAILED_EXIT: i32 = 3;

const BOOTSTRAP: &str = r#"
import importlib, json, os, sys, types
phase, module_name, base_dir = sys.argv[1], sys.argv[2], sys.argv[3]
sys.path.insert(0, base_dir)
parameters = types.SimpleNamespace(**json.loads(os.environ["REGTEST_PARAMETERS"]))
module = importlib.import_module(module_name)
if phase == "run":
    module.run(parameters)
    sys.exit(0)
sys.exit(0 if module.analyze(parameters) else 3)
"#;

/// Errors raised while driving a suite script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to start interpreter `{python}`: {source}")]
    Spawn {
        python: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode parameters: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{phase} phase of {module} exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        phase: Phase,
        module: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

/// Which suite function the bootstrap calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Run,
    Analyze,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Run => "run",
            Phase::Analyze => "analyze",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suite backed by its on-disk script.
#[derive(Debug, Clone)]
pub struct ScriptSuite {
    python: String,
    base_dir: PathBuf,
    module: String,
    script: PathBuf,
}

impl ScriptSuite {
    pub fn new(
        python: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        module: impl Into<String>,
        script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            python: python.into(),
            base_dir: base_dir.into(),
            module: module.into(),
            script: script.into(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Build the interpreter command for `phase` without running it.
    pub fn command(&self, phase: Phase, parameters: &Parameters) -> Result<Command, ScriptError> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c")
            .arg(BOOTSTRAP)
            .arg(phase.as_str())
            .arg(&self.module)
            .arg(&self.base_dir)
            .env(PARAMETERS_ENV, parameters.to_json()?)
            .current_dir(&parameters.output_path);
        Ok(cmd)
    }

    #[tracing::instrument(skip_all, fields(module = %self.module, phase = %phase))]
    fn invoke(&self, phase: Phase, parameters: &Parameters) -> Result<Output, ScriptError> {
        let output = self
            .command(phase, parameters)?
            .output()
            .map_err(|source| ScriptError::Spawn {
                python: self.python.clone(),
                source,
            })?;

        self.forward("stdout", &output.stdout, false);
        Ok(output)
    }

    /// Echo captured child output through the log, at `warn` when `failing`.
    fn forward(&self, stream: &str, bytes: &[u8], failing: bool) {
        for line in String::from_utf8_lossy(bytes).lines() {
            if failing {
                tracing::warn!(target: "regtest::script", module = %self.module, stream, "{line}");
            } else {
                tracing::info!(target: "regtest::script", module = %self.module, stream, "{line}");
            }
        }
    }

    fn failed(&self, phase: Phase, output: &Output) -> ScriptError {
        ScriptError::Failed {
            phase,
            module: self.module.clone(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Suite for ScriptSuite {
    fn run(&self, parameters: &Parameters) -> SuiteResult<()> {
        let output = self.invoke(Phase::Run, parameters)?;
        if output.status.success() {
            self.forward("stderr", &output.stderr, false);
            Ok(())
        } else {
            Err(self.failed(Phase::Run, &output).into())
        }
    }

    fn analyze(&self, parameters: &Parameters) -> SuiteResult<bool> {
        let output = self.invoke(Phase::Analyze, parameters)?;
        match output.status.code() {
            Some(0) => {
                self.forward("stderr", &output.stderr, false);
                Ok(true)
            }
            Some(ANALYZE_FAILED_EXIT) => {
                self.forward("stderr", &output.stderr, true);
                Ok(false)
            }
            _ => Err(self.failed(Phase::Analyze, &output).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn params(output: &Path) -> Parameters {
        Parameters {
            driver_path: PathBuf::from("/bin/true"),
            driver_input_path: PathBuf::from("/dev/null"),
            test_path: output.parent().unwrap().to_path_buf(),
            output_path: output.to_path_buf(),
            mpi_cmd: String::new(),
            mpi_opts: vec!["--oversubscribe".to_string()],
        }
    }

    fn python_available() -> bool {
        let found = Command::new("python3").arg("--version").output().is_ok_and(|o| o.status.success());
        if !found {
            eprintln!("skipping: python3 is not installed");
        }
        found
    }

    /// Log sink shared between the subscriber and the assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Run `f` with `info`-level logs captured, as the CLI shows them by default.
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, captured.text())
    }

    /// Lay out `<base>/test_suites/<name>/<name>.py` with `body` and an output folder.
    fn suite_layout(name: &str, body: &str) -> (tempfile::TempDir, ScriptSuite, Parameters) {
        let base = tempfile::tempdir().unwrap();
        let suite_dir = base.path().join("test_suites").join(name);
        let output = suite_dir.join("output");
        fs::create_dir_all(&output).unwrap();
        let script = suite_dir.join(format!("{name}.py"));
        fs::write(&script, body).unwrap();

        let suite = ScriptSuite::new("python3", base.path(), format!("test_suites.{name}.{name}"), script);
        let params = params(&output);
        (base, suite, params)
    }

    #[test]
    fn test_command_carries_phase_module_and_parameters() {
        let output = PathBuf::from("/work/test_suites/a/output");
        let suite = ScriptSuite::new("python3", "/work", "test_suites.a.a", "/work/test_suites/a/a.py");
        let cmd = suite.command(Phase::Analyze, &params(&output)).unwrap();

        assert_eq!(cmd.get_program(), "python3");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "-c");
        assert_eq!(&args[2..], ["analyze", "test_suites.a.a", "/work"]);
        assert_eq!(cmd.get_current_dir(), Some(output.as_path()));

        let env = cmd
            .get_envs()
            .find(|(k, _)| *k == PARAMETERS_ENV)
            .and_then(|(_, v)| v)
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(env.contains("--oversubscribe"));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Run.to_string(), "run");
        assert_eq!(Phase::Analyze.to_string(), "analyze");
    }

    #[test]
    fn test_script_run_and_analyze_pass() {
        if !python_available() {
            return;
        }
        let (_base, suite, params) = suite_layout(
            "writes_marker",
            r#"
import os

def run(parameters):
    with open(os.path.join(parameters.output_path, "marker.txt"), "w") as f:
        f.write(" ".join(parameters.mpi_opts))

def analyze(parameters):
    with open("marker.txt") as f:
        return f.read() == "--oversubscribe"
"#,
        );

        suite.run(&params).unwrap();
        assert!(params.output_path.join("marker.txt").is_file());
        assert!(suite.analyze(&params).unwrap());
    }

    #[test]
    fn test_script_analyze_false_is_a_fail_not_an_error() {
        if !python_available() {
            return;
        }
        let (_base, suite, params) = suite_layout(
            "always_fails",
            "def run(parameters):\n    pass\n\ndef analyze(parameters):\n    return False\n",
        );

        suite.run(&params).unwrap();
        assert!(!suite.analyze(&params).unwrap());
    }

    #[test]
    fn test_failed_analysis_explains_itself_in_the_log() {
        if !python_available() {
            return;
        }
        let (_base, suite, params) = suite_layout(
            "explains",
            r#"
import sys

def run(parameters):
    print("driver finished 10 cycles")

def analyze(parameters):
    print("comparing against gold file")
    print("L1 error 0.25 exceeds tolerance 1e-3", file=sys.stderr)
    return False
"#,
        );

        let (ran, logs) = with_captured_logs(|| suite.run(&params));
        ran.unwrap();
        assert!(logs.contains("driver finished 10 cycles"), "logs:\n{logs}");

        let (verdict, logs) = with_captured_logs(|| suite.analyze(&params));
        assert!(!verdict.unwrap());
        assert!(logs.contains("comparing against gold file"), "logs:\n{logs}");
        let explanation = logs
            .lines()
            .find(|line| line.contains("L1 error 0.25 exceeds tolerance 1e-3"))
            .unwrap_or_else(|| panic!("stderr not forwarded:\n{logs}"));
        assert!(explanation.contains("WARN"));
    }

    #[test]
    fn test_script_exception_is_an_error() {
        if !python_available() {
            return;
        }
        let (_base, suite, params) = suite_layout(
            "raises",
            "def run(parameters):\n    raise RuntimeError('driver crashed')\n\ndef analyze(parameters):\n    raise ValueError('no data')\n",
        );

        let err = suite.run(&params).unwrap_err();
        assert!(err.to_string().contains("run phase of test_suites.raises.raises"));
        assert!(err.to_string().contains("driver crashed"));

        let err = suite.analyze(&params).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn test_missing_interpreter_is_a_spawn_error() {
        let (_base, _suite, params) = suite_layout("noop", "def run(p):\n    pass\n");
        let suite = ScriptSuite::new(
            "definitely-not-an-interpreter",
            "/",
            "test_suites.noop.noop",
            "/test_suites/noop/noop.py",
        );

        let err = suite.run(&params).unwrap_err();
        let err = err.downcast::<ScriptError>().unwrap();
        assert!(matches!(*err, ScriptError::Spawn { .. }));
    }
}
