//! File transplant errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transplant operations
pub type CopyResult<T> = Result<T, CopyError>;

/// Errors while moving tablespace files into the target directory.
///
/// A `CopyError` is fatal for its table but leaves the target table empty
/// and safely retriable: nothing has been imported yet.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source file missing: {0}")]
    MissingSource(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set ownership {uid}:{gid} on {path}: {source}")]
    Chown {
        path: PathBuf,
        uid: u32,
        gid: u32,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    pub(crate) fn io_at(path: &std::path::Path, source: io::Error) -> Self {
        CopyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
