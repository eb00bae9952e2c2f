//! Structured JSON logger
//!
//! - One log line = one event
//! - Deterministic key ordering (header keys, then fields alphabetically)
//! - Synchronous, no buffering

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace,
    /// Normal operations
    Info,
    /// Recoverable issues
    Warn,
    /// Operation failures
    Error,
    /// Unrecoverable, job aborts
    Fatal,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A run-scoped structured logger writing JSON lines to stdout.
#[derive(Debug, Clone)]
pub struct Logger {
    run_id: Uuid,
}

impl Logger {
    pub fn new(run_id: Uuid) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    pub fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }

    pub fn fatal(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Fatal, event, fields);
    }

    /// Log an event with the given severity and fields.
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format_line(&ts, &self.run_id, severity, event, fields);
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

/// Render one log line. Header keys come first in fixed order, then the
/// event fields sorted alphabetically by key.
pub fn format_line(
    ts: &str,
    run_id: &Uuid,
    severity: Severity,
    event: &str,
    fields: &[(&str, &str)],
) -> String {
    let mut sorted: Vec<(&str, &str)> = fields.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let mut line = String::with_capacity(128);
    line.push('{');
    line.push_str(&format!("\"ts\":{}", json_str(ts)));
    line.push_str(&format!(",\"severity\":{}", json_str(severity.as_str())));
    line.push_str(&format!(",\"event\":{}", json_str(event)));
    line.push_str(&format!(",\"run_id\":{}", json_str(&run_id.to_string())));
    for (key, value) in sorted {
        line.push_str(&format!(",{}:{}", json_str(key), json_str(value)));
    }
    line.push('}');
    line
}

fn json_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_id() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn test_format_line_basic() {
        let line = format_line("2026-01-01T00:00:00.000Z", &run_id(), Severity::Info, "state", &[]);
        assert_eq!(
            line,
            "{\"ts\":\"2026-01-01T00:00:00.000Z\",\"severity\":\"INFO\",\
             \"event\":\"state\",\"run_id\":\"00000000-0000-0000-0000-000000000000\"}"
        );
    }

    #[test]
    fn test_format_line_is_valid_json() {
        let line = format_line(
            "2026-01-01T00:00:00.000Z",
            &run_id(),
            Severity::Error,
            "table_failed",
            &[("table", "salaries"), ("reason", "schema mismatch")],
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "table_failed");
        assert_eq!(value["table"], "salaries");
        assert_eq!(value["severity"], "ERROR");
    }

    #[test]
    fn test_fields_sorted_alphabetically() {
        let line = format_line(
            "t",
            &run_id(),
            Severity::Info,
            "e",
            &[("zebra", "1"), ("alpha", "2")],
        );
        let alpha = line.find("\"alpha\"").unwrap();
        let zebra = line.find("\"zebra\"").unwrap();
        assert!(alpha < zebra);
    }

    #[test]
    fn test_values_are_escaped() {
        let line = format_line(
            "t",
            &run_id(),
            Severity::Warn,
            "e",
            &[("reason", "quote \" and \\ backslash\nnewline")],
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["reason"], "quote \" and \\ backslash\nnewline");
    }

    #[test]
    fn test_severity_strings() {
        assert_eq!(Severity::Trace.as_str(), "TRACE");
        assert_eq!(Severity::Fatal.as_str(), "FATAL");
        assert!(Severity::Warn < Severity::Error);
    }
}
