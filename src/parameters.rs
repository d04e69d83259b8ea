//! Resolved settings handed to a suite's `run` and `analyze` phases.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Paths and MPI settings for one test invocation.
///
/// Built once by [`crate::TestCase::new`] and shared by reference with the
/// suite afterwards. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Simulation driver executable
    pub driver_path: PathBuf,
    /// Input file passed to the driver with `-i`
    pub driver_input_path: PathBuf,
    /// Suite folder
    pub test_path: PathBuf,
    /// `<test_path>/output`, recreated before every run
    pub output_path: PathBuf,
    /// MPI launcher (e.g. `mpiexec`), empty for serial runs
    pub mpi_cmd: String,
    /// Flags placed between the launcher and the driver
    pub mpi_opts: Vec<String>,
}

impl Parameters {
    /// Whether the driver should be started through an MPI launcher.
    pub fn uses_mpi(&self) -> bool {
        !self.mpi_cmd.trim().is_empty()
    }

    /// JSON form used to hand parameters to out-of-process suites.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
