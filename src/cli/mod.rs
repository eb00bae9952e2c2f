//! CLI module for physrestore
//!
//! Provides the command-line interface:
//! - run: execute the restore job described by the environment
//! - check-config: validate configuration without touching either server

mod args;
mod commands;

pub use args::{Cli, Command};
pub use commands::{check_config, run_restore};

/// Dispatch the parsed command and return the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse_args();
    match cli.command {
        Command::Run => run_restore(),
        Command::CheckConfig => check_config(),
    }
}
