//! Process supervisor errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to launch the disposable source instance. Always aborts the
/// whole job: no table can proceed without a source.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("backup data directory {0} does not exist")]
    MissingDataDir(PathBuf),

    #[error("failed to spawn {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },
}

/// Readiness polling failure.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// The probe never succeeded within the bound. Typical cause: InnoDB
    /// recovery still running against a large or damaged backup directory.
    #[error("source instance not ready after {waited_secs}s")]
    Expired { waited_secs: u64 },

    /// The server answered, but rejected the probe. This is a
    /// misconfiguration (bad credentials, missing database), not slowness;
    /// waiting longer cannot fix it.
    #[error("liveness probe rejected: {reason}")]
    ProbeRejected { reason: String },
}

/// Shutdown did not complete cleanly. The orchestrator may proceed after a
/// forced kill (file operations only need the process gone), but records
/// the degraded shutdown in the job report.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("graceful shutdown timed out after {waited_secs}s; process killed")]
    Forced { waited_secs: u64 },

    #[error("failed to wait on source process: {0}")]
    Wait(#[source] io::Error),

    #[error("no source instance is running")]
    NotRunning,
}
