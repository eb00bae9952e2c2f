//! Import coordinator errors

use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Per-table import failures. Unlike a copy failure, a failed import
/// leaves the target table in a broken, non-importable state: it must be
/// dropped and recreated (a fresh reset) before any retry.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The tablespace's column/key metadata does not match the target
    /// table definition.
    #[error("schema mismatch importing `{table}`: {message}")]
    SchemaMismatch { table: String, message: String },

    /// The `.ibd`/`.cfg` pair is absent, unreadable, or corrupt — often an
    /// ownership/permission problem rather than bad data.
    #[error("tablespace missing or unreadable for `{table}`: {message}")]
    MissingOrCorrupt { table: String, message: String },

    #[error("import of `{table}` rejected: {message}")]
    Rejected { table: String, message: String },

    #[error("imported table `{table}` failed the post-import probe: {source}")]
    Unreadable {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("target connection failed: {0}")]
    Connection(#[source] sqlx::Error),
}
