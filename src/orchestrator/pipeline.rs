//! Pipeline seams and their SQL-backed implementation
//!
//! The orchestrator drives two collaborators through traits so its
//! sequencing guarantees (lock release ordering, exactly-one shutdown)
//! are testable with scripted fakes: the source instance's lifecycle and
//! the per-table restore steps.

use std::io;
use std::time::Duration;

use sqlx::mysql::MySqlConnection;

use crate::config::RestoreConfig;
use crate::connection::ConnectionParams;
use crate::export::{self, ExportError, TablespaceArtifact};
use crate::import::{self, ImportError};
use crate::observability::Logger;
use crate::reset::{self, ResetError, ResetOutcome};
use crate::schema::{self, ExtractionError};
use crate::supervisor::{ShutdownError, SourceSupervisor, StartupError, TimeoutError};
use crate::transplant::{self, CopyError};

/// Lifecycle of the disposable source instance.
#[allow(async_fn_in_trait)]
pub trait SourceServer {
    async fn start(&mut self) -> Result<(), StartupError>;
    async fn wait_ready(&mut self) -> Result<(), TimeoutError>;
    async fn stop(&mut self) -> Result<(), ShutdownError>;
}

impl SourceServer for SourceSupervisor {
    async fn start(&mut self) -> Result<(), StartupError> {
        SourceSupervisor::start(self)
    }

    async fn wait_ready(&mut self) -> Result<(), TimeoutError> {
        SourceSupervisor::wait_ready(self).await
    }

    async fn stop(&mut self) -> Result<(), ShutdownError> {
        SourceSupervisor::stop(self).await
    }
}

/// The restore steps, setup plus per-table. Implementations hold the two
/// server connections; the orchestrator holds the sequence.
#[allow(async_fn_in_trait)]
pub trait RestorePipeline {
    async fn extract_schema(&mut self) -> Result<Vec<String>, ExtractionError>;
    async fn reset_tables(&mut self, ddl: &[String]) -> Result<ResetOutcome, ResetError>;
    async fn export_table(&mut self, table: &str) -> Result<TablespaceArtifact, ExportError>;
    async fn transplant_table(&mut self, artifact: &TablespaceArtifact) -> Result<(), CopyError>;
    async fn release_export(&mut self) -> Result<(), ExportError>;
    async fn import_table(&mut self, table: &str) -> Result<(), ImportError>;
}

/// Production pipeline: source connection for export, target connection
/// for reset/import, filesystem in between.
pub struct SqlPipeline {
    config: RestoreConfig,
    logger: Logger,
    source: Option<MySqlConnection>,
    target: Option<MySqlConnection>,
    lock_attempts: u32,
    lock_backoff: Duration,
}

impl SqlPipeline {
    pub fn new(config: RestoreConfig, logger: Logger) -> Self {
        Self {
            config,
            logger,
            source: None,
            target: None,
            lock_attempts: 5,
            lock_backoff: Duration::from_secs(2),
        }
    }

    async fn source_conn(&mut self) -> Result<&mut MySqlConnection, sqlx::Error> {
        source_or_connect(&mut self.source, self.config.source_params()).await
    }

    async fn target_conn(&mut self) -> Result<&mut MySqlConnection, sqlx::Error> {
        source_or_connect(&mut self.target, self.config.target_params()).await
    }
}

async fn source_or_connect(
    slot: &mut Option<MySqlConnection>,
    params: ConnectionParams,
) -> Result<&mut MySqlConnection, sqlx::Error> {
    match slot {
        Some(conn) => Ok(conn),
        None => {
            let conn = params.connect().await?;
            Ok(slot.insert(conn))
        }
    }
}

impl RestorePipeline for SqlPipeline {
    async fn extract_schema(&mut self) -> Result<Vec<String>, ExtractionError> {
        let statements = schema::extract_schema(
            &self.config.mariadb_dump_bin,
            &self.config.source_params(),
        )
        .await?;
        self.logger.info(
            "schema_extracted",
            &[
                ("db", &self.config.backup_db),
                ("statements", &statements.len().to_string()),
            ],
        );
        Ok(statements)
    }

    async fn reset_tables(&mut self, ddl: &[String]) -> Result<ResetOutcome, ResetError> {
        let db = self.config.target_db.clone();
        let db_dir = self.config.target_db_dir.clone();
        let conn = self.target_conn().await.map_err(ResetError::Connection)?;
        reset::reset_tables(conn, &db, &db_dir, ddl).await
    }

    async fn export_table(&mut self, table: &str) -> Result<TablespaceArtifact, ExportError> {
        let db_dir = self.config.source_db_dir();
        let attempts = self.lock_attempts;
        let backoff = self.lock_backoff;
        let conn = self.source_conn().await.map_err(ExportError::Connection)?;
        export::acquire(conn, &db_dir, table, attempts, backoff).await
    }

    async fn transplant_table(&mut self, artifact: &TablespaceArtifact) -> Result<(), CopyError> {
        let artifact = artifact.clone();
        let target_dir = self.config.target_db_dir.clone();
        let owner = self.config.file_owner;

        let join_dir = target_dir.clone();
        tokio::task::spawn_blocking(move || transplant::transplant(&artifact, &target_dir, owner))
            .await
            .map_err(|e| CopyError::Io {
                path: join_dir,
                source: io::Error::other(e),
            })?
    }

    async fn release_export(&mut self) -> Result<(), ExportError> {
        let conn = self.source_conn().await.map_err(ExportError::Connection)?;
        export::release(conn).await
    }

    async fn import_table(&mut self, table: &str) -> Result<(), ImportError> {
        let conn = self.target_conn().await.map_err(ImportError::Connection)?;
        import::import_table(conn, table).await
    }
}
