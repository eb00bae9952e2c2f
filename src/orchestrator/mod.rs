//! Restore Orchestrator
//!
//! The only component aware of the full workflow. Sequences:
//!
//! ```text
//! Init → SourceStarting → SourceReady → SchemaExtracted → TablesReset
//!      → per table: Exporting → Transplanting → Importing → TableDone|TableFailed
//!      → SourceStopping → Done
//! ```
//!
//! Two guarantees are enforced here and nowhere else:
//! - within a table, export → transplant → release → import is strictly
//!   ordered, and the export lock is released on the failure path too;
//! - `SourceStopping` is reached on every path — setup failure, per-table
//!   failure, fail-fast, cancellation — so the disposable instance never
//!   outlives the run.
//!
//! There is no partial-job retry: a failed table's whole per-table
//! sequence must be re-run from a fresh reset, because neither a failed
//! import nor a half-copied file pair is self-healing.

mod errors;
mod pipeline;
mod report;

pub use errors::RestoreError;
pub use pipeline::{RestorePipeline, SourceServer, SqlPipeline};
pub use report::{
    JobReport, StepStage, TableOutcome, TableStatus, EXIT_ALL_FAILED, EXIT_FATAL, EXIT_OK,
    EXIT_PARTIAL,
};

use std::future::Future;

use chrono::Utc;

use crate::observability::Logger;

pub struct Orchestrator;

impl Orchestrator {
    /// Run one restore job to completion.
    ///
    /// `cancel` resolving aborts the in-flight work (no rollback of a
    /// committed import is attempted) but still shuts the source down.
    pub async fn run<S, P, C>(
        supervisor: &mut S,
        pipeline: &mut P,
        fail_fast: bool,
        logger: &Logger,
        cancel: C,
    ) -> Result<JobReport, RestoreError>
    where
        S: SourceServer,
        P: RestorePipeline,
        C: Future<Output = ()>,
    {
        let started_at = Utc::now();

        logger.info("state", &[("state", "source_starting")]);
        supervisor.start().await?;

        let outcome = tokio::select! {
            result = Self::run_inner(supervisor, pipeline, fail_fast, logger, started_at) => result,
            _ = cancel => {
                logger.warn("job_cancelled", &[]);
                Err(RestoreError::Cancelled)
            }
        };

        // The one obligation that survives every outcome above.
        logger.info("state", &[("state", "source_stopping")]);
        let clean_shutdown = match supervisor.stop().await {
            Ok(()) => true,
            Err(e) => {
                logger.warn("source_shutdown_degraded", &[("reason", &e.to_string())]);
                false
            }
        };

        let mut report = outcome?;
        report.clean_shutdown = clean_shutdown;
        report.finished_at = Utc::now();
        logger.info("state", &[("state", "done")]);
        Ok(report)
    }

    async fn run_inner<S, P>(
        supervisor: &mut S,
        pipeline: &mut P,
        fail_fast: bool,
        logger: &Logger,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<JobReport, RestoreError>
    where
        S: SourceServer,
        P: RestorePipeline,
    {
        supervisor.wait_ready().await?;
        logger.info("state", &[("state", "source_ready")]);

        let ddl = pipeline.extract_schema().await?;
        logger.info("state", &[("state", "schema_extracted")]);

        let reset = pipeline.reset_tables(&ddl).await?;
        logger.info(
            "state",
            &[
                ("state", "tables_reset"),
                ("tables", &reset.tables.len().to_string()),
            ],
        );

        // Views never carry a tablespace, so a failed view drop is worth a
        // warning but never a per-table verdict.
        for (view, reason) in &reset.view_failures {
            logger.warn("view_drop_failed", &[("view", view), ("reason", reason)]);
        }

        let mut report = JobReport::new(logger.run_id(), started_at);
        for (table, reason) in &reset.failures {
            logger.error(
                "table_failed",
                &[("table", table), ("stage", "reset"), ("reason", reason)],
            );
            report.record(
                table,
                TableStatus::Failed {
                    stage: StepStage::Reset,
                    reason: reason.clone(),
                },
            );
        }

        let mut aborted = fail_fast && !reset.failures.is_empty();
        for table in &reset.tables {
            if aborted {
                report.record(table, TableStatus::Skipped);
                continue;
            }
            let status = Self::restore_table(pipeline, table, logger).await;
            if matches!(status, TableStatus::Failed { .. }) && fail_fast {
                aborted = true;
            }
            report.record(table, status);
        }

        Ok(report)
    }

    /// One table's export → transplant → release → import sequence.
    async fn restore_table<P: RestorePipeline>(
        pipeline: &mut P,
        table: &str,
        logger: &Logger,
    ) -> TableStatus {
        logger.info("state", &[("state", "exporting"), ("table", table)]);
        let artifact = match pipeline.export_table(table).await {
            Ok(artifact) => artifact,
            Err(e) => return Self::failed(logger, table, StepStage::Export, e.to_string()),
        };

        logger.info("state", &[("state", "transplanting"), ("table", table)]);
        let copied = pipeline.transplant_table(&artifact).await;

        // The lock is released after the copy has finished — whether it
        // succeeded or not — and before the import is attempted.
        let released = pipeline.release_export().await;

        if let Err(e) = copied {
            return Self::failed(logger, table, StepStage::Transplant, e.to_string());
        }
        if let Err(e) = released {
            return Self::failed(logger, table, StepStage::Export, e.to_string());
        }

        logger.info("state", &[("state", "importing"), ("table", table)]);
        match pipeline.import_table(table).await {
            Ok(()) => {
                logger.info("table_done", &[("table", table)]);
                TableStatus::Imported
            }
            Err(e) => Self::failed(logger, table, StepStage::Import, e.to_string()),
        }
    }

    fn failed(logger: &Logger, table: &str, stage: StepStage, reason: String) -> TableStatus {
        logger.error(
            "table_failed",
            &[("table", table), ("stage", stage.as_str()), ("reason", &reason)],
        );
        TableStatus::Failed { stage, reason }
    }
}
