//! Export coordinator errors

use std::path::PathBuf;

use thiserror::Error;

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Per-table export failures. The coordinator guarantees the table lock is
/// released (or never held) by the time any of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("table `{0}` does not exist on the source")]
    NoSuchTable(String),

    #[error("table `{table}` uses unsupported engine {engine}; only InnoDB tablespaces are transportable")]
    UnsupportedEngine { table: String, engine: String },

    #[error("could not lock `{table}` for export after {attempts} attempts")]
    LockTimeout { table: String, attempts: u32 },

    /// The export lock is held but the expected file is absent — the `.cfg`
    /// in particular only exists while `FLUSH ... FOR EXPORT` is in effect.
    #[error("exported file missing for `{table}`: {path}")]
    MissingArtifact { table: String, path: PathBuf },

    #[error("export of `{table}` failed: {source}")]
    Flush {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("source connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("unlock failed: {0}")]
    Unlock(#[source] sqlx::Error),
}
