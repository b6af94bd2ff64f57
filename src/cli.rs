// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use bluegreen::jobs::JobName;
use bluegreen::output::OutputMode;
use bluegreen::types::EnvName;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bluegreen")]
#[command(about = "Blue/green environment staging: application VMs and RDS database copies")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discovered in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bluegreen.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Explain the jobs that can be run
    Jobs,

    /// Run a job against an environment
    Run {
        #[arg(value_enum)]
        job: JobName,

        /// Target environment
        #[arg(long)]
        env: EnvName,

        /// Live environment to copy from (database jobs)
        #[arg(long)]
        live_env: Option<EnvName>,

        /// Log what would be done without changing anything
        #[arg(long)]
        noop: bool,

        /// Break an existing environment lock
        #[arg(long)]
        force_lock: bool,
    },

    /// Print an environment's persisted state as JSON
    Show {
        #[arg(long)]
        env: EnvName,
    },
}
