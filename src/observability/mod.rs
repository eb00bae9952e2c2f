//! Structured logging for physrestore
//!
//! One log line = one JSON event, written synchronously to stdout.
//! Every event carries the run id so a restore can be traced end to end
//! across the source-instance lifecycle and the per-table pipeline.

mod logger;

pub use logger::{Logger, Severity};
