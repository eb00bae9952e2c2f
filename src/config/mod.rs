//! Environment-based configuration
//!
//! The tool runs as a one-shot container process; all configuration is
//! environment variables. `RestoreConfig::from_env` resolves and validates
//! everything up front so a misconfiguration is reported before either
//! server is touched.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionParams;
use crate::transplant::FileOwner;

/// Configuration errors, all reported before the job starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("DB_FILE_UID and DB_FILE_GID must be set together")]
    OwnerPair,
}

/// Fully resolved configuration for one restore job.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Database name inside the backup data directory.
    pub backup_db: String,
    /// Pre-existing database on the target instance.
    pub target_db: String,

    pub target_host: String,
    pub target_port: u16,
    pub target_password: String,
    pub backup_password: String,

    /// Data directory the disposable source instance is booted against.
    pub backup_base_dir: PathBuf,
    /// The target database's directory inside the target server's data dir,
    /// mounted writable for this process.
    pub target_db_dir: PathBuf,

    /// Port the disposable source instance listens on (loopback only).
    pub source_port: u16,

    /// Numeric ownership applied to transplanted files; `None` leaves the
    /// files owned by this process (only correct when both run as one user).
    pub file_owner: Option<FileOwner>,

    /// Abort the job on the first per-table failure instead of continuing.
    pub fail_fast: bool,

    pub ready_timeout: Duration,
    pub shutdown_timeout: Duration,

    pub mariadbd_bin: String,
    pub mariadb_dump_bin: String,
}

impl RestoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration through a lookup function (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let backup_db = required("BACKUP_DB")?;
        let target_db = required("TARGET_DB")?;
        let backup_password = required("BACKUP_DB_ROOT_PASSWORD")?;
        let target_password = required("TARGET_DB_ROOT_PASSWORD")?;

        let target_host =
            lookup("TARGET_DB_HOST").unwrap_or_else(|| "host.docker.internal".to_string());
        let target_port = parse_u16(&lookup, "TARGET_DB_PORT", 3306)?;
        let source_port = parse_u16(&lookup, "SOURCE_DB_PORT", 3306)?;

        let backup_base_dir = PathBuf::from(
            lookup("BACKUP_DB_BASE_DIR").unwrap_or_else(|| "/var/lib/mysql".to_string()),
        );
        let target_db_dir =
            PathBuf::from(lookup("TARGET_DB_DIR").unwrap_or_else(|| "/target_db".to_string()));

        let file_owner = match (lookup("DB_FILE_UID"), lookup("DB_FILE_GID")) {
            (Some(uid), Some(gid)) => Some(FileOwner {
                uid: parse_num("DB_FILE_UID", &uid)?,
                gid: parse_num("DB_FILE_GID", &gid)?,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::OwnerPair),
        };

        let fail_fast = match lookup("FAIL_FAST") {
            None => false,
            Some(raw) => parse_bool("FAIL_FAST", &raw)?,
        };

        let ready_timeout =
            Duration::from_secs(parse_u64(&lookup, "READY_TIMEOUT_SECS", 180)?);
        let shutdown_timeout =
            Duration::from_secs(parse_u64(&lookup, "SHUTDOWN_TIMEOUT_SECS", 60)?);

        let mariadbd_bin = lookup("MARIADBD_BIN").unwrap_or_else(|| "mariadbd".to_string());
        let mariadb_dump_bin =
            lookup("MARIADB_DUMP_BIN").unwrap_or_else(|| "mariadb-dump".to_string());

        Ok(Self {
            backup_db,
            target_db,
            target_host,
            target_port,
            target_password,
            backup_password,
            backup_base_dir,
            target_db_dir,
            source_port,
            file_owner,
            fail_fast,
            ready_timeout,
            shutdown_timeout,
            mariadbd_bin,
            mariadb_dump_bin,
        })
    }

    /// Connection parameters for the disposable source instance.
    pub fn source_params(&self) -> ConnectionParams {
        ConnectionParams::new(
            "127.0.0.1",
            self.source_port,
            "root",
            self.backup_password.clone(),
            self.backup_db.clone(),
        )
    }

    /// Connection parameters for the long-running target instance.
    pub fn target_params(&self) -> ConnectionParams {
        ConnectionParams::new(
            self.target_host.clone(),
            self.target_port,
            "root",
            self.target_password.clone(),
            self.target_db.clone(),
        )
    }

    /// The backup database's directory inside the source data dir.
    pub fn source_db_dir(&self) -> PathBuf {
        self.backup_base_dir.join(&self.backup_db)
    }

    /// Human-readable summary with secrets redacted.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let mut line = |k: &str, v: fmt::Arguments<'_>| {
            out.push_str(&format!("{:<26}{}\n", k, v));
        };
        line("backup database:", format_args!("{}", self.backup_db));
        line("target database:", format_args!("{}", self.target_db));
        line(
            "target server:",
            format_args!("{}:{}", self.target_host, self.target_port),
        );
        line(
            "source instance:",
            format_args!("127.0.0.1:{}", self.source_port),
        );
        line(
            "backup data dir:",
            format_args!("{}", self.backup_base_dir.display()),
        );
        line(
            "target table dir:",
            format_args!("{}", self.target_db_dir.display()),
        );
        match self.file_owner {
            Some(owner) => line("file owner:", format_args!("{}:{}", owner.uid, owner.gid)),
            None => line("file owner:", format_args!("(unchanged)")),
        }
        line("fail fast:", format_args!("{}", self.fail_fast));
        line(
            "ready timeout:",
            format_args!("{}s", self.ready_timeout.as_secs()),
        );
        line(
            "shutdown timeout:",
            format_args!("{}s", self.shutdown_timeout.as_secs()),
        );
        line("passwords:", format_args!("(redacted)"));
        out
    }
}

fn parse_num(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

fn parse_u16<F>(lookup: &F, var: &'static str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BACKUP_DB", "employees"),
            ("TARGET_DB", "abc_demo"),
            ("BACKUP_DB_ROOT_PASSWORD", "toor"),
            ("TARGET_DB_ROOT_PASSWORD", "secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<RestoreConfig, ConfigError> {
        RestoreConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_minimal_env_uses_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.target_host, "host.docker.internal");
        assert_eq!(config.target_port, 3306);
        assert_eq!(config.backup_base_dir, PathBuf::from("/var/lib/mysql"));
        assert_eq!(config.target_db_dir, PathBuf::from("/target_db"));
        assert!(config.file_owner.is_none());
        assert!(!config.fail_fast);
        assert_eq!(config.ready_timeout, Duration::from_secs(180));
        assert_eq!(config.mariadbd_bin, "mariadbd");
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = base_env();
        env.remove("TARGET_DB");
        match load(&env) {
            Err(ConfigError::Missing(var)) => assert_eq!(var, "TARGET_DB"),
            other => panic!("expected Missing, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env = base_env();
        env.insert("TARGET_DB_PORT", "not-a-port");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "TARGET_DB_PORT", .. })
        ));
    }

    #[test]
    fn test_owner_must_be_set_together() {
        let mut env = base_env();
        env.insert("DB_FILE_UID", "999");
        assert!(matches!(load(&env), Err(ConfigError::OwnerPair)));

        env.insert("DB_FILE_GID", "999");
        let config = load(&env).unwrap();
        let owner = config.file_owner.unwrap();
        assert_eq!((owner.uid, owner.gid), (999, 999));
    }

    #[test]
    fn test_fail_fast_parsing() {
        let mut env = base_env();
        for raw in ["1", "true", "YES"] {
            env.insert("FAIL_FAST", raw);
            assert!(load(&env).unwrap().fail_fast, "raw = {}", raw);
        }
        for raw in ["0", "false", "no"] {
            env.insert("FAIL_FAST", raw);
            assert!(!load(&env).unwrap().fail_fast, "raw = {}", raw);
        }
        env.insert("FAIL_FAST", "maybe");
        assert!(matches!(load(&env), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_source_db_dir_joins_database_name() {
        let config = load(&base_env()).unwrap();
        assert_eq!(
            config.source_db_dir(),
            PathBuf::from("/var/lib/mysql/employees")
        );
    }

    #[test]
    fn test_summary_redacts_passwords() {
        let config = load(&base_env()).unwrap();
        let summary = config.summary();
        assert!(!summary.contains("toor"));
        assert!(!summary.contains("secret"));
        assert!(summary.contains("employees"));
        assert!(summary.contains("abc_demo"));
    }
}
