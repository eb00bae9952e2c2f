//! Per-table outcome report
//!
//! The job's user-visible result: one row per table, plus overall process
//! exit code for operator scripting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Exit code contract: all imported.
pub const EXIT_OK: i32 = 0;
/// Fatal setup error; no per-table verdicts exist.
pub const EXIT_FATAL: i32 = 1;
/// Some tables imported, some failed or were skipped.
pub const EXIT_PARTIAL: i32 = 2;
/// No table imported.
pub const EXIT_ALL_FAILED: i32 = 3;

/// Which step a table failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStage {
    Reset,
    Export,
    Transplant,
    Import,
}

impl StepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStage::Reset => "reset",
            StepStage::Export => "export",
            StepStage::Transplant => "transplant",
            StepStage::Import => "import",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    Imported,
    Failed { stage: StepStage, reason: String },
    /// Not attempted because an earlier table failed under fail-fast.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub table: String,
    #[serde(flatten)]
    pub status: TableStatus,
}

/// The whole job's result.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables: Vec<TableOutcome>,
    /// False when the source instance had to be killed.
    pub clean_shutdown: bool,
}

impl JobReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            tables: Vec::new(),
            clean_shutdown: true,
        }
    }

    pub fn record(&mut self, table: &str, status: TableStatus) {
        self.tables.push(TableOutcome {
            table: table.to_string(),
            status,
        });
    }

    pub fn imported_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.status == TableStatus::Imported)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.tables.len() - self.imported_count()
    }

    pub fn exit_code(&self) -> i32 {
        let imported = self.imported_count();
        let failed = self.failed_count();
        match (imported, failed) {
            (_, 0) => EXIT_OK,
            (0, _) => EXIT_ALL_FAILED,
            _ => EXIT_PARTIAL,
        }
    }

    /// Aligned text table for the operator.
    pub fn render_text(&self) -> String {
        let name_width = self
            .tables
            .iter()
            .map(|t| t.table.len())
            .chain(std::iter::once("table".len()))
            .max()
            .unwrap_or(5);

        let mut out = String::new();
        out.push_str(&format!(
            "{:<w$}  {:<8}  {:<10}  reason\n",
            "table",
            "status",
            "stage",
            w = name_width
        ));
        for outcome in &self.tables {
            let (status, stage, reason) = match &outcome.status {
                TableStatus::Imported => ("ok", "-", String::from("-")),
                TableStatus::Failed { stage, reason } => ("failed", stage.as_str(), reason.clone()),
                TableStatus::Skipped => ("skipped", "-", String::from("-")),
            };
            out.push_str(&format!(
                "{:<w$}  {:<8}  {:<10}  {}\n",
                outcome.table,
                status,
                stage,
                reason,
                w = name_width
            ));
        }
        out.push_str(&format!(
            "{}/{} tables imported\n",
            self.imported_count(),
            self.tables.len()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(statuses: Vec<(&str, TableStatus)>) -> JobReport {
        let mut report = JobReport::new(Uuid::nil(), Utc::now());
        for (table, status) in statuses {
            report.record(table, status);
        }
        report
    }

    fn failed(stage: StepStage) -> TableStatus {
        TableStatus::Failed {
            stage,
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn test_exit_code_all_imported() {
        let report = report_with(vec![
            ("employees", TableStatus::Imported),
            ("salaries", TableStatus::Imported),
        ]);
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[test]
    fn test_exit_code_empty_job_is_ok() {
        let report = report_with(vec![]);
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[test]
    fn test_exit_code_partial() {
        let report = report_with(vec![
            ("employees", TableStatus::Imported),
            ("salaries", failed(StepStage::Import)),
        ]);
        assert_eq!(report.exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_exit_code_all_failed() {
        let report = report_with(vec![
            ("employees", failed(StepStage::Export)),
            ("salaries", failed(StepStage::Import)),
        ]);
        assert_eq!(report.exit_code(), EXIT_ALL_FAILED);
    }

    #[test]
    fn test_skipped_counts_against_success() {
        let report = report_with(vec![
            ("employees", TableStatus::Imported),
            ("salaries", TableStatus::Skipped),
        ]);
        assert_eq!(report.exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_render_text_contains_rows_and_summary() {
        let report = report_with(vec![
            ("employees", TableStatus::Imported),
            ("salaries", failed(StepStage::Import)),
        ]);
        let text = report.render_text();
        assert!(text.contains("employees"));
        assert!(text.contains("failed"));
        assert!(text.contains("import"));
        assert!(text.contains("1/2 tables imported"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = report_with(vec![("employees", failed(StepStage::Transplant))]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tables"][0]["table"], "employees");
        assert_eq!(value["tables"][0]["status"], "failed");
        assert_eq!(value["tables"][0]["stage"], "transplant");
    }
}
