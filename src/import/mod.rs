//! Import Coordinator
//!
//! Asks the target server to adopt a transplanted tablespace via
//! `ALTER TABLE ... IMPORT TABLESPACE`, then probes the table answers
//! queries. Preconditions are the orchestrator's to guarantee: the target
//! table exists, is empty, was never imported into, and the `.ibd`/`.cfg`
//! pair on disk is exactly the one just transplanted with correct
//! ownership. Import is not an idempotent file operation — there is no
//! retry here, only strict preconditions.

mod errors;

pub use errors::{ImportError, ImportResult};

use sqlx::mysql::MySqlConnection;

use crate::connection::{mysql_error_number, quote_ident};

/// ER_TABLE_SCHEMA_MISMATCH
const SCHEMA_MISMATCH: u16 = 1808;
/// ER_IO_READ_ERROR
const IO_READ_ERROR: u16 = 1810;
/// ER_TABLESPACE_MISSING
const TABLESPACE_MISSING: u16 = 1812;
/// ER_INTERNAL_ERROR (raised for corrupt or truncated .cfg files)
const INTERNAL_ERROR: u16 = 1815;

/// Import the transplanted tablespace into `table` on the target.
pub async fn import_table(conn: &mut MySqlConnection, table: &str) -> ImportResult<()> {
    let stmt = format!("ALTER TABLE {} IMPORT TABLESPACE", quote_ident(table));
    sqlx::query(&stmt)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify(table, e))?;

    // The table must be immediately queryable with the backup's data.
    let probe = format!("SELECT 1 FROM {} LIMIT 1", quote_ident(table));
    sqlx::query(&probe)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| ImportError::Unreadable {
            table: table.to_string(),
            source: e,
        })?;

    Ok(())
}

fn classify(table: &str, err: sqlx::Error) -> ImportError {
    let message = match err.as_database_error() {
        Some(db) => db.message().to_string(),
        None => return ImportError::Connection(err),
    };

    match mysql_error_number(&err) {
        Some(SCHEMA_MISMATCH) => ImportError::SchemaMismatch {
            table: table.to_string(),
            message,
        },
        Some(IO_READ_ERROR) | Some(TABLESPACE_MISSING) | Some(INTERNAL_ERROR) => {
            ImportError::MissingOrCorrupt {
                table: table.to_string(),
                message,
            }
        }
        _ => ImportError::Rejected {
            table: table.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transport_error_is_connection() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "broken pipe",
        ));
        assert!(matches!(
            classify("employees", err),
            ImportError::Connection(_)
        ));
    }

    #[test]
    fn test_import_statement_is_quoted() {
        let stmt = format!("ALTER TABLE {} IMPORT TABLESPACE", quote_ident("emp`x"));
        assert_eq!(stmt, "ALTER TABLE `emp``x` IMPORT TABLESPACE");
    }
}
