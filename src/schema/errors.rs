//! Schema extraction errors

use std::io;

use thiserror::Error;

/// Result type for schema extraction
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Schema dump failures. Extraction is a setup-phase step: any of these
/// aborts the whole job, since no table can be recreated without DDL.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to spawn {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },

    #[error("{bin} exited with {status}: {stderr}")]
    DumpFailed {
        bin: String,
        status: String,
        stderr: String,
    },

    #[error("dump output for `{db}` was not valid UTF-8")]
    Encoding { db: String },

    #[error("dump produced no statements for `{db}`")]
    EmptyDump { db: String },
}
