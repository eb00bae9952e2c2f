//! Tablespace Reset
//!
//! Prepares the target database to adopt transplanted tablespaces:
//! 1. drop every existing table and view,
//! 2. recreate the tables empty from the extracted DDL,
//! 3. `ALTER TABLE ... DISCARD TABLESPACE` each recreated base table,
//! 4. verify no `.ibd`/`.cfg` files remain in the database directory.
//!
//! InnoDB matches an imported tablespace against metadata baked in at
//! table-creation time, so the import slot must be a freshly created,
//! never-imported table whose own tablespace has been discarded.
//! https://mariadb.com/kb/en/innodb-file-per-table-tablespaces/#importing-transportable-tablespaces-for-non-partitioned-tables
//!
//! Foreign-key checks are disabled across the drop/recreate window so
//! statement order never matters.
//! https://mariadb.com/kb/en/innodb-file-per-table-tablespaces/#foreign-key-constraints
//!
//! Running the reset twice with the same DDL yields the same empty tables
//! and no residual artifacts, which is what makes a per-table retry safe.

mod errors;

pub use errors::{ResetError, ResetResult};

use std::fs;
use std::path::Path;

use sqlx::mysql::MySqlConnection;
use sqlx::Row;

use crate::connection::quote_ident;
use crate::schema::statement_table_name;

/// Result of one reset pass.
#[derive(Debug, Default)]
pub struct ResetOutcome {
    /// Base tables recreated, discarded, and ready for transplant.
    pub tables: Vec<String>,
    /// Per-table failures (table, reason); these tables are excluded from
    /// `tables` and must not proceed to export.
    pub failures: Vec<(String, String)>,
    /// View drops that failed (view, reason). Views never enter the
    /// transplant list, so these are reported separately from table
    /// failures and do not affect the per-table verdicts.
    pub view_failures: Vec<(String, String)>,
}

/// Reset `db` on the target connection from `ddl`.
pub async fn reset_tables(
    conn: &mut MySqlConnection,
    db: &str,
    db_dir: &Path,
    ddl: &[String],
) -> ResetResult<ResetOutcome> {
    sqlx::query("SET SESSION foreign_key_checks = 0")
        .execute(&mut *conn)
        .await
        .map_err(ResetError::ForeignKeyToggle)?;

    let result = reset_inner(conn, db, ddl).await;

    // Re-enable regardless of how the reset went; the session may be
    // reused for imports afterwards.
    sqlx::query("SET SESSION foreign_key_checks = 1")
        .execute(&mut *conn)
        .await
        .map_err(ResetError::ForeignKeyToggle)?;

    let mut outcome = result?;
    check_residual_artifacts(db_dir, &mut outcome)?;
    Ok(outcome)
}

async fn reset_inner(
    conn: &mut MySqlConnection,
    db: &str,
    ddl: &[String],
) -> ResetResult<ResetOutcome> {
    let mut outcome = ResetOutcome::default();

    // Drop whatever is currently present, views included.
    for (name, kind) in list_tables(conn, db).await? {
        if kind == "VIEW" {
            let stmt = format!("DROP VIEW IF EXISTS {}", quote_ident(&name));
            if let Err(e) = sqlx::query(&stmt).execute(&mut *conn).await {
                outcome
                    .view_failures
                    .push((name, format!("drop failed: {}", e)));
            }
        } else {
            let stmt = format!("DROP TABLE IF EXISTS {}", quote_ident(&name));
            if let Err(e) = sqlx::query(&stmt).execute(&mut *conn).await {
                outcome.fail(name, format!("drop failed: {}", e));
            }
        }
    }

    // Recreate from the extracted DDL. A failing CREATE TABLE is pinned to
    // its table; a failing statement with no table is job-fatal.
    for stmt in ddl {
        if let Err(e) = sqlx::query(stmt).execute(&mut *conn).await {
            match statement_table_name(stmt) {
                Some(table) => outcome.fail(table, format!("recreation failed: {}", e)),
                None => {
                    return Err(ResetError::Statement {
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    // The recreated base tables, minus anything that already failed.
    let failed: Vec<String> = outcome.failures.iter().map(|(t, _)| t.clone()).collect();
    let created: Vec<String> = list_tables(conn, db)
        .await?
        .into_iter()
        .filter(|(_, kind)| kind == "BASE TABLE")
        .map(|(name, _)| name)
        .filter(|name| !failed.contains(name))
        .collect();

    // Discard each fresh tablespace so the import slot is open.
    for table in created {
        let stmt = format!("ALTER TABLE {} DISCARD TABLESPACE", quote_ident(&table));
        match sqlx::query(&stmt).execute(&mut *conn).await {
            Ok(_) => outcome.tables.push(table),
            Err(e) => outcome.fail(table, format!("discard failed: {}", e)),
        }
    }

    Ok(outcome)
}

async fn list_tables(
    conn: &mut MySqlConnection,
    db: &str,
) -> ResetResult<Vec<(String, String)>> {
    let rows = sqlx::query("SHOW FULL TABLES")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| ResetError::ListTables {
            db: db.to_string(),
            source: e,
        })?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get(0).map_err(|e| ResetError::ListTables {
            db: db.to_string(),
            source: e,
        })?;
        let kind: String = row.try_get(1).map_err(|e| ResetError::ListTables {
            db: db.to_string(),
            source: e,
        })?;
        tables.push((name, kind));
    }
    Ok(tables)
}

/// Scan `db_dir` for leftover tablespace files. After discard, no reset
/// table owns an `.ibd` or `.cfg`; a leftover for a known table fails that
/// table, a leftover for an unknown table fails the job.
fn check_residual_artifacts(db_dir: &Path, outcome: &mut ResetOutcome) -> ResetResult<()> {
    let residuals = scan_tablespace_files(db_dir)?;
    let mut unknown = Vec::new();

    for file in residuals {
        let stem = Path::new(&file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(pos) = outcome.tables.iter().position(|t| *t == stem) {
            let table = outcome.tables.remove(pos);
            outcome.fail(table, format!("residual tablespace file {}", file));
        } else {
            unknown.push(file);
        }
    }

    if !unknown.is_empty() {
        return Err(ResetError::ResidualArtifacts {
            dir: db_dir.to_path_buf(),
            files: unknown,
        });
    }
    Ok(())
}

/// File names of every `.ibd`/`.cfg` in `dir`.
pub fn scan_tablespace_files(dir: &Path) -> ResetResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| ResetError::Scan {
        dir: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ResetError::Scan {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".ibd") || name.ends_with(".cfg") {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

impl ResetOutcome {
    fn fail(&mut self, table: String, reason: String) {
        self.failures.push((table, reason));
    }
}
