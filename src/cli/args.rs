//! CLI argument definitions using clap
//!
//! Commands:
//! - physrestore run
//! - physrestore check-config

use clap::{Parser, Subcommand};

/// physrestore - physical restore of MariaDB/InnoDB tables via
/// transportable tablespaces
#[derive(Parser, Debug)]
#[command(name = "physrestore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the restore job described by the environment
    Run,

    /// Validate the environment and print the resolved job (secrets
    /// redacted) without touching either server
    CheckConfig,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
