//! Tablespace reset errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for reset operations
pub type ResetResult<T> = Result<T, ResetError>;

/// Job-fatal reset failures. Per-table DDL/discard failures are not errors
/// at this level — they are carried in [`super::ResetOutcome`] so the
/// remaining tables can still proceed.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("target connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("failed to toggle foreign key checks: {0}")]
    ForeignKeyToggle(#[source] sqlx::Error),

    #[error("failed to list tables in `{db}`: {source}")]
    ListTables {
        db: String,
        #[source]
        source: sqlx::Error,
    },

    /// A statement that could not be attributed to any table failed; with
    /// no table to pin the failure on, the whole reset is unsound.
    #[error("statement failed during recreation: {message}")]
    Statement { message: String },

    /// Tablespace files exist on disk that no just-reset table accounts
    /// for. A stale artifact from an earlier run would be mistaken for the
    /// current transplant, so this stops the job.
    #[error("unexpected tablespace files in {dir}: {files:?}")]
    ResidualArtifacts { dir: PathBuf, files: Vec<String> },

    #[error("could not scan {dir}: {source}")]
    Scan {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}
