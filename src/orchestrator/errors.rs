//! Job-fatal orchestrator errors
//!
//! Setup-phase failures abort the whole job: without a running source, an
//! extracted schema, and reset target tables, no table can proceed.
//! Per-table failures never surface here — they live in the job report.

use thiserror::Error;

use crate::reset::ResetError;
use crate::schema::ExtractionError;
use crate::supervisor::{StartupError, TimeoutError};

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("source startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("source never became ready: {0}")]
    Ready(#[from] TimeoutError),

    #[error("schema extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("tablespace reset failed: {0}")]
    Reset(#[from] ResetError),

    #[error("restore cancelled")]
    Cancelled,
}
