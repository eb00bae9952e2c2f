//! Dump sanitization and statement splitting
//!
//! mariadb-dump output is not directly replayable on the disposable
//! instance:
//! - recent versions prepend a `/*M!999999\- enable the sandbox mode */`
//!   line which is a client directive, not executable SQL
//!   (https://github.com/frappe/frappe/pull/26855);
//! - view definitions carry `DEFINER=... SQL SECURITY DEFINER` clauses for
//!   accounts that do not exist on the instance replaying the dump
//!   (https://github.com/frappe/frappe/pull/28879).
//! Both are stripped before the dump is split into statements.

use std::sync::OnceLock;

use regex::Regex;

/// Remove client directives and definer clauses from a raw dump.
pub fn sanitize(dump: &str) -> String {
    static SANDBOX: OnceLock<Regex> = OnceLock::new();
    static DEFINER: OnceLock<Regex> = OnceLock::new();
    let sandbox = SANDBOX.get_or_init(|| {
        Regex::new(r"/\*M?!999999\\- enable the sandbox mode \*/")
            .expect("sandbox pattern is valid")
    });
    let definer = DEFINER.get_or_init(|| {
        Regex::new(r"/\*![0-9]* DEFINER=[^ ]* SQL SECURITY DEFINER \*/")
            .expect("definer pattern is valid")
    });

    let cleaned = sandbox.replace_all(dump, "");
    definer.replace_all(&cleaned, "").into_owned()
}

/// Split a sanitized dump into individual statements.
///
/// mariadb-dump terminates every statement with `;` at end of line;
/// splitting on `;\n` keeps `;` inside quoted literals intact for the DDL
/// the dump itself produces.
pub fn split_statements(dump: &str) -> Vec<String> {
    dump.split(";\n")
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}

/// Table name of a `CREATE TABLE` / `DROP TABLE` statement, if it is one.
/// Used to attribute a recreation failure to its table.
pub fn statement_table_name(stmt: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\b(?:CREATE|DROP)\s+TABLE\s+(?:IF\s+(?:NOT\s+)?EXISTS\s+)?`?([^`\s(;]+)")
            .expect("table name pattern is valid")
    });
    pattern
        .captures(stmt)
        .map(|caps| caps[1].trim_end_matches('`').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_sandbox_directive() {
        let dump = "/*M!999999\\- enable the sandbox mode */ \n-- MariaDB dump 10.19\nCREATE TABLE `t` (a int);\n";
        let cleaned = sanitize(dump);
        assert!(!cleaned.contains("sandbox mode"));
        assert!(cleaned.contains("CREATE TABLE `t`"));
    }

    #[test]
    fn test_sanitize_strips_sandbox_directive_without_m_prefix() {
        let dump = "/*!999999\\- enable the sandbox mode */\nSELECT 1;\n";
        assert!(!sanitize(dump).contains("sandbox mode"));
    }

    #[test]
    fn test_sanitize_strips_definer_clause() {
        let dump =
            "/*!50013 DEFINER=`admin`@`%` SQL SECURITY DEFINER */ VIEW `v` AS SELECT 1;\n";
        let cleaned = sanitize(dump);
        assert!(!cleaned.contains("DEFINER"));
        assert!(cleaned.contains("VIEW `v`"));
    }

    #[test]
    fn test_split_statements_drops_blanks() {
        let dump = "CREATE TABLE `a` (x int);\n\nCREATE TABLE `b` (y int);\n";
        let stmts = split_statements(dump);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TABLE `a`"));
        assert!(stmts[1].starts_with("CREATE TABLE `b`"));
    }

    #[test]
    fn test_split_statements_keeps_multiline_ddl_together() {
        let dump = "CREATE TABLE `emp` (\n  `id` int(11),\n  `name` varchar(10)\n) ENGINE=InnoDB;\n";
        let stmts = split_statements(dump);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("varchar(10)"));
    }

    #[test]
    fn test_statement_table_name_create() {
        assert_eq!(
            statement_table_name("CREATE TABLE `employees` (\n `id` int\n)"),
            Some("employees".to_string())
        );
    }

    #[test]
    fn test_statement_table_name_drop_if_exists() {
        assert_eq!(
            statement_table_name("DROP TABLE IF EXISTS `salaries`"),
            Some("salaries".to_string())
        );
    }

    #[test]
    fn test_statement_table_name_unquoted() {
        assert_eq!(
            statement_table_name("create table if not exists dept(id int)"),
            Some("dept".to_string())
        );
    }

    #[test]
    fn test_statement_table_name_rejects_non_table_ddl() {
        assert_eq!(statement_table_name("CREATE VIEW `v` AS SELECT 1"), None);
        assert_eq!(statement_table_name("/*!40101 SET NAMES utf8mb4 */"), None);
    }
}
