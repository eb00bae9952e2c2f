//! Schema dump via mariadb-dump
//!
//! The schema tool is an external collaborator: given connection
//! credentials it produces CREATE TABLE / CREATE VIEW statements for a
//! database. `--no-data` keeps the dump to DDL only; row data travels as
//! tablespace files, never as SQL.

use tokio::process::Command;

use crate::connection::ConnectionParams;

use super::errors::{ExtractionError, ExtractionResult};

/// Run the dump tool against `params` and return the raw dump text.
pub async fn dump_schema(bin: &str, params: &ConnectionParams) -> ExtractionResult<String> {
    let output = Command::new(bin)
        .arg("-h")
        .arg(&params.host)
        .arg("-P")
        .arg(params.port.to_string())
        .arg("-u")
        .arg(&params.user)
        .arg(format!("-p{}", params.password))
        .arg("--no-data")
        .arg(&params.database)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ExtractionError::Spawn {
            bin: bin.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ExtractionError::DumpFailed {
            bin: bin.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| ExtractionError::Encoding {
        db: params.database.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams::new("127.0.0.1", 3306, "root", "toor", "employees")
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let err = dump_schema("definitely-not-a-real-dump-binary", &params())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        // `false` exits 1 with no output; stands in for a dump refusal.
        let err = dump_schema("false", &params()).await.unwrap_err();
        match err {
            ExtractionError::DumpFailed { bin, .. } => assert_eq!(bin, "false"),
            other => panic!("expected DumpFailed, got {:?}", other),
        }
    }
}
