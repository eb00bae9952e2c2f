//! Process Supervisor
//!
//! Owns the disposable source instance: spawns `mariadbd` against the
//! mounted backup data directory, polls readiness, and guarantees the
//! process is gone by job end — gracefully via SQL `SHUTDOWN` when
//! possible, by SIGKILL when not.
//!
//! The data directory is left exactly as the engine leaves it (including
//! redo logs); the backup volume is a single-use staging area and is never
//! cleaned up here.

mod errors;

pub use errors::{ShutdownError, StartupError, TimeoutError};

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use sqlx::{Connection, Executor};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};

use crate::connection::ConnectionParams;
use crate::observability::Logger;

/// A running source instance: process identity plus the connection
/// parameters that reach it. Owned exclusively by the supervisor.
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    pub pid: Option<u32>,
    pub params: ConnectionParams,
}

/// Supervisor configuration, resolved from [`crate::config::RestoreConfig`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub datadir: PathBuf,
    pub bin: String,
    pub params: ConnectionParams,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub shutdown_timeout: Duration,
}

/// One probe attempt's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    /// Connection refused/reset: the server is not accepting connections
    /// yet. Retryable.
    NotYet,
    /// The server responded with an error (authentication, privileges,
    /// unknown database). Fatal: retrying cannot change the answer.
    Rejected(String),
}

pub struct SourceSupervisor {
    config: SupervisorConfig,
    logger: Logger,
    handle: Option<ServerHandle>,
}

impl SourceSupervisor {
    pub fn new(config: SupervisorConfig, logger: Logger) -> Self {
        Self {
            config,
            logger,
            handle: None,
        }
    }

    /// Launch the engine against the backup data directory. Success means
    /// the process spawned; readiness is a separate, polled step — the
    /// port being bound is not sufficient while InnoDB recovery runs.
    pub fn start(&mut self) -> Result<(), StartupError> {
        if !self.config.datadir.is_dir() {
            return Err(StartupError::MissingDataDir(self.config.datadir.clone()));
        }

        let socket = self.config.datadir.join("physrestore.sock");
        let child = Command::new(&self.config.bin)
            .arg("--no-defaults")
            .arg(format!("--datadir={}", self.config.datadir.display()))
            .arg(format!("--port={}", self.config.params.port))
            .arg("--bind-address=127.0.0.1")
            .arg(format!("--socket={}", socket.display()))
            .arg("--skip-slave-start")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StartupError::Spawn {
                bin: self.config.bin.clone(),
                source: e,
            })?;

        let pid = child.id();
        self.logger.info(
            "source_spawned",
            &[
                ("bin", &self.config.bin),
                ("pid", &pid.map_or_else(|| "?".to_string(), |p| p.to_string())),
                ("datadir", &self.config.datadir.display().to_string()),
            ],
        );

        self.handle = Some(ServerHandle {
            child,
            pid,
            params: self.config.params.clone(),
        });
        Ok(())
    }

    /// Poll the authenticated liveness probe until the instance answers.
    pub async fn wait_ready(&mut self) -> Result<(), TimeoutError> {
        let params = self.config.params.clone();
        wait_ready_with(
            || probe(params.clone()),
            self.config.poll_interval,
            self.config.ready_timeout,
        )
        .await
    }

    /// Stop the source instance. Graceful path: SQL `SHUTDOWN`, then wait
    /// for process exit. On timeout, escalate to SIGKILL and report it.
    pub async fn stop(&mut self) -> Result<(), ShutdownError> {
        let mut handle = self.handle.take().ok_or(ShutdownError::NotRunning)?;

        // A connection error here usually means the server is already on
        // its way down, which is the outcome we want anyway.
        if let Ok(mut conn) = handle.params.connect().await {
            let _ = conn.execute("SHUTDOWN").await;
        }

        match timeout(self.config.shutdown_timeout, handle.child.wait()).await {
            Ok(Ok(status)) => {
                self.logger
                    .info("source_stopped", &[("status", &status.to_string())]);
                Ok(())
            }
            Ok(Err(e)) => Err(ShutdownError::Wait(e)),
            Err(_) => {
                let _ = handle.child.kill().await;
                self.logger.warn(
                    "source_killed",
                    &[(
                        "waited_secs",
                        &self.config.shutdown_timeout.as_secs().to_string(),
                    )],
                );
                Err(ShutdownError::Forced {
                    waited_secs: self.config.shutdown_timeout.as_secs(),
                })
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

/// One authenticated probe: connect and ping.
async fn probe(params: ConnectionParams) -> ProbeStatus {
    let attempt = async {
        let mut conn = params.connect().await?;
        conn.ping().await?;
        let _ = conn.close().await;
        Ok::<(), sqlx::Error>(())
    };
    match attempt.await {
        Ok(()) => ProbeStatus::Ready,
        Err(e) => classify_probe_error(&e),
    }
}

/// Map a probe failure onto retryable/fatal. An error *response* from the
/// server proves the server is up, so it can only mean misconfiguration;
/// transport-level failures mean "not yet ready".
fn classify_probe_error(err: &sqlx::Error) -> ProbeStatus {
    match err {
        sqlx::Error::Database(db) => ProbeStatus::Rejected(db.message().to_string()),
        _ => ProbeStatus::NotYet,
    }
}

/// The readiness loop, factored out over an arbitrary probe.
///
/// Returns as soon as the probe reports `Ready`, fails fast on `Rejected`,
/// and gives up with `Expired` once the next poll would pass the deadline.
pub async fn wait_ready_with<F, Fut>(
    mut probe: F,
    interval: Duration,
    ready_timeout: Duration,
) -> Result<(), TimeoutError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeStatus>,
{
    let deadline = Instant::now() + ready_timeout;
    loop {
        match probe().await {
            ProbeStatus::Ready => return Ok(()),
            ProbeStatus::Rejected(reason) => return Err(TimeoutError::ProbeRejected { reason }),
            ProbeStatus::NotYet => {}
        }
        if Instant::now() + interval > deadline {
            return Err(TimeoutError::Expired {
                waited_secs: ready_timeout.as_secs(),
            });
        }
        sleep(interval).await;
    }
}
