//! CLI command implementations
//!
//! `run` builds the runtime, wires the supervisor and pipeline together,
//! and maps the job outcome onto the process exit contract:
//! 0 = every table imported, 1 = fatal setup error, 2 = partial failure,
//! 3 = every table failed.

use uuid::Uuid;

use crate::config::RestoreConfig;
use crate::observability::Logger;
use crate::orchestrator::{Orchestrator, SqlPipeline, EXIT_FATAL, EXIT_OK};
use crate::supervisor::{SourceSupervisor, SupervisorConfig};

use std::time::Duration;

/// Readiness poll interval; coarse because InnoDB recovery on a large
/// backup takes minutes, not milliseconds.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub fn run_restore() -> i32 {
    let config = match RestoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return EXIT_FATAL;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            return EXIT_FATAL;
        }
    };

    runtime.block_on(run_job(config))
}

async fn run_job(config: RestoreConfig) -> i32 {
    let run_id = Uuid::new_v4();
    let logger = Logger::new(run_id);
    logger.info(
        "job_started",
        &[
            ("backup_db", &config.backup_db),
            ("target_db", &config.target_db),
            ("fail_fast", &config.fail_fast.to_string()),
        ],
    );

    let mut supervisor = SourceSupervisor::new(supervisor_config(&config), logger.clone());
    let mut pipeline = SqlPipeline::new(config.clone(), logger.clone());

    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match Orchestrator::run(
        &mut supervisor,
        &mut pipeline,
        config.fail_fast,
        &logger,
        cancel,
    )
    .await
    {
        Ok(report) => {
            print!("{}", report.render_text());
            match serde_json::to_string(&report) {
                Ok(json) => logger.info("job_report", &[("report", &json)]),
                Err(e) => logger.warn("job_report_unserializable", &[("reason", &e.to_string())]),
            }
            report.exit_code()
        }
        Err(e) => {
            logger.fatal("job_failed", &[("reason", &e.to_string())]);
            eprintln!("restore failed: {}", e);
            EXIT_FATAL
        }
    }
}

pub fn check_config() -> i32 {
    match RestoreConfig::from_env() {
        Ok(config) => {
            print!("{}", config.summary());
            EXIT_OK
        }
        Err(e) => {
            eprintln!("configuration error: {}", e);
            EXIT_FATAL
        }
    }
}

fn supervisor_config(config: &RestoreConfig) -> SupervisorConfig {
    SupervisorConfig {
        datadir: config.backup_base_dir.clone(),
        bin: config.mariadbd_bin.clone(),
        params: config.source_params(),
        poll_interval: POLL_INTERVAL,
        ready_timeout: config.ready_timeout,
        shutdown_timeout: config.shutdown_timeout,
    }
}
