//! Launching the simulation driver from a Rust suite.
//!
//! The command line is `[mpi_cmd] [mpi_opts...] <driver> -i <driver_input> [args...]`.
//! Launcher and option strings are split on whitespace, so `--mpirun "mpiexec -n 4"`
//! and `--mpirun mpiexec --mpirun-opts "-n 4"` produce the same argv.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::parameters::Parameters;

/// Name of the combined stdout/stderr log written into the output folder.
pub const DRIVER_LOG: &str = "driver.log";

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: OsString,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write driver log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("driver exited with {status}, see {}", .log.display())]
    Failed { status: ExitStatus, log: PathBuf },
}

/// Captured result of a successful driver run.
#[derive(Debug, Clone)]
pub struct DriverOutput {
    pub stdout: String,
    pub stderr: String,
    pub log: PathBuf,
}

/// A driver command line assembled from [`Parameters`].
#[derive(Debug, Clone)]
pub struct DriverInvocation {
    argv: Vec<OsString>,
    working_dir: PathBuf,
}

impl DriverInvocation {
    pub fn new(parameters: &Parameters) -> Self {
        let mut argv: Vec<OsString> = Vec::new();
        if parameters.uses_mpi() {
            argv.extend(parameters.mpi_cmd.split_whitespace().map(OsString::from));
            for opt in &parameters.mpi_opts {
                argv.extend(opt.split_whitespace().map(OsString::from));
            }
        }
        argv.push(parameters.driver_path.clone().into_os_string());
        argv.push("-i".into());
        argv.push(parameters.driver_input_path.clone().into_os_string());

        Self {
            argv,
            working_dir: parameters.output_path.clone(),
        }
    }

    /// Append one driver argument (e.g. an input override like `time/tlim=1.0`).
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn command(&self) -> Command {
        // argv always holds at least the driver, input flag and input path
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]).current_dir(&self.working_dir);
        cmd
    }

    /// Run to completion, logging output to `<output>/driver.log`.
    #[tracing::instrument(skip_all, fields(program = ?self.argv[0]))]
    pub fn run(&self) -> Result<DriverOutput, DriverError> {
        tracing::info!(argv = ?self.argv, "launching driver");

        let output = self.command().output().map_err(|source| DriverError::Spawn {
            program: self.argv[0].clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let log = self.working_dir.join(DRIVER_LOG);
        fs::write(&log, format!("{stdout}{stderr}")).map_err(|source| DriverError::Log {
            path: log.clone(),
            source,
        })?;

        if !output.status.success() {
            tracing::warn!(status = %output.status, "driver failed");
            return Err(DriverError::Failed {
                status: output.status,
                log,
            });
        }

        Ok(DriverOutput { stdout, stderr, log })
    }
}
