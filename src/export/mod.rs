//! Export Coordinator
//!
//! Quiesces one source table and produces its export-ready tablespace
//! files. The protocol, all on the same dedicated source connection:
//!
//! 1. `FLUSH TABLES t FOR EXPORT` — acquires the table read lock, writes
//!    the `.cfg` metadata file, and pins the `.ibd` stable, holding the
//!    lock until `UNLOCK TABLES`. This must be the session's only lock
//!    statement: a preceding `FLUSH TABLES t WITH READ LOCK` would put
//!    the session into locked-tables mode, where a table-list flush is
//!    rejected with ER_LOCK_OR_ACTIVE_TRANSACTION (1192)
//! 2. caller copies the files while the lock is held
//! 3. `UNLOCK TABLES` — only after the copy has completed, success or not
//!
//! https://mariadb.com/kb/en/innodb-file-per-table-tablespaces/#exporting-transportable-tablespaces-for-non-partitioned-tables
//!
//! The table lock is the only cross-component shared mutable resource in
//! the system; it is acquired and released entirely inside this module's
//! acquire/release pair.

mod errors;

pub use errors::{ExportError, ExportResult};

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::mysql::MySqlConnection;
use sqlx::Row;
use tokio::time::sleep;

use crate::connection::{mysql_error_number, quote_ident};

/// ER_LOCK_WAIT_TIMEOUT
const LOCK_WAIT_TIMEOUT: u16 = 1205;

/// The `.ibd`/`.cfg` pair for one table. Only valid between the export
/// flush and the import that consumes it; never reuse one across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablespaceArtifact {
    pub table: String,
    pub ibd: PathBuf,
    pub cfg: PathBuf,
}

/// Lock and flush `table` for export, returning its artifact paths.
///
/// Lock-wait timeouts are retried up to `attempts` with `backoff` between
/// tries; any other failure releases whatever was acquired and returns.
/// On success the caller owns an exclusive obligation to call [`release`]
/// once the file copy has finished.
pub async fn acquire(
    conn: &mut MySqlConnection,
    source_db_dir: &Path,
    table: &str,
    attempts: u32,
    backoff: Duration,
) -> ExportResult<TablespaceArtifact> {
    check_engine(conn, table).await?;

    let for_export = export_statement(table);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match sqlx::query(&for_export).execute(&mut *conn).await {
            Ok(_) => break,
            Err(e) => {
                // Whatever happened, do not leave a partial lock behind.
                let _ = sqlx::query("UNLOCK TABLES").execute(&mut *conn).await;

                if mysql_error_number(&e) == Some(LOCK_WAIT_TIMEOUT) {
                    if attempt >= attempts {
                        return Err(ExportError::LockTimeout {
                            table: table.to_string(),
                            attempts,
                        });
                    }
                    sleep(backoff).await;
                    continue;
                }
                return Err(ExportError::Flush {
                    table: table.to_string(),
                    source: e,
                });
            }
        }
    }

    let artifact = TablespaceArtifact {
        table: table.to_string(),
        ibd: source_db_dir.join(format!("{}.ibd", table)),
        cfg: source_db_dir.join(format!("{}.cfg", table)),
    };

    // Both files must exist now; the .cfg is only written by the export
    // flush itself.
    for path in [&artifact.ibd, &artifact.cfg] {
        if !path.is_file() {
            let _ = sqlx::query("UNLOCK TABLES").execute(&mut *conn).await;
            return Err(ExportError::MissingArtifact {
                table: table.to_string(),
                path: path.clone(),
            });
        }
    }

    Ok(artifact)
}

/// Release the export lock. Must run on the same session that acquired
/// it, after the caller's copy has completed — success or failure.
pub async fn release(conn: &mut MySqlConnection) -> ExportResult<()> {
    sqlx::query("UNLOCK TABLES")
        .execute(conn)
        .await
        .map(|_| ())
        .map_err(ExportError::Unlock)
}

/// The critical-section entry statement: one `FLUSH ... FOR EXPORT`,
/// which acquires and holds the read lock itself.
fn export_statement(table: &str) -> String {
    format!("FLUSH TABLES {} FOR EXPORT", quote_ident(table))
}

/// Reject non-InnoDB tables before taking any lock; only InnoDB
/// tablespaces are transportable.
async fn check_engine(conn: &mut MySqlConnection, table: &str) -> ExportResult<()> {
    let row = sqlx::query(
        "SELECT ENGINE FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_optional(&mut *conn)
    .await
    .map_err(ExportError::Connection)?;

    let row = row.ok_or_else(|| ExportError::NoSuchTable(table.to_string()))?;
    let engine: Option<String> = row.try_get(0).map_err(ExportError::Connection)?;

    match engine.as_deref() {
        Some("InnoDB") => Ok(()),
        Some(other) => Err(ExportError::UnsupportedEngine {
            table: table.to_string(),
            engine: other.to_string(),
        }),
        None => Err(ExportError::UnsupportedEngine {
            table: table.to_string(),
            engine: "none".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_live_in_source_db_dir() {
        let artifact = TablespaceArtifact {
            table: "employees".to_string(),
            ibd: Path::new("/var/lib/mysql/employees").join("employees.ibd"),
            cfg: Path::new("/var/lib/mysql/employees").join("employees.cfg"),
        };
        assert_eq!(
            artifact.ibd,
            PathBuf::from("/var/lib/mysql/employees/employees.ibd")
        );
        assert_eq!(artifact.cfg.extension().unwrap(), "cfg");
    }

    #[test]
    fn test_flush_statements_quote_table() {
        assert_eq!(
            export_statement("odd`name"),
            "FLUSH TABLES `odd``name` FOR EXPORT"
        );
    }

    #[test]
    fn test_export_critical_section_is_one_statement() {
        // A separate `WITH READ LOCK` before the export flush would put
        // the session into locked-tables mode, where the export flush
        // itself is refused with error 1192.
        let stmt = export_statement("employees");
        assert_eq!(stmt, "FLUSH TABLES `employees` FOR EXPORT");
        assert!(!stmt.contains("WITH READ LOCK"));
        assert!(!stmt.contains(';'));
    }
}
