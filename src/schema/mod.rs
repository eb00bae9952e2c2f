//! Schema Extractor
//!
//! Dumps the backup database's DDL from the disposable source instance,
//! sanitizes it, and splits it into individually executable statements.
//! Statement order is the dump tool's order, which is dependency-safe;
//! recreation additionally runs with foreign-key checks disabled so any
//! order is acceptable.

mod errors;
mod extractor;
mod sanitizer;

pub use errors::{ExtractionError, ExtractionResult};
pub use extractor::dump_schema;
pub use sanitizer::{sanitize, split_statements, statement_table_name};

use crate::connection::ConnectionParams;

/// Extract the ordered DDL statements for `params.database`.
pub async fn extract_schema(bin: &str, params: &ConnectionParams) -> ExtractionResult<Vec<String>> {
    let raw = dump_schema(bin, params).await?;
    let statements = split_statements(&sanitize(&raw));
    if statements.is_empty() {
        return Err(ExtractionError::EmptyDump {
            db: params.database.clone(),
        });
    }
    Ok(statements)
}
