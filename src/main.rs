// ABOUTME: Entry point for the bluegreen CLI application.
// ABOUTME: Parses arguments, dispatches to command handlers, and maps errors to exit codes.

mod cli;
mod commands;

use bluegreen::config::Config;
use bluegreen::error::{Result, ReturnCode};
use bluegreen::jobs::{JobRequest, explain_valid_jobs};
use bluegreen::output::{Output, OutputMode};
use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Commands};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            eprint!("{}", explain_valid_jobs());
            return ExitCode::from(ReturnCode::InvalidInvocation.code());
        }
    };

    init_tracing(&cli);
    let output = Output::new(cli.output_mode());

    match run(cli, &output).await {
        Ok(()) => ExitCode::from(ReturnCode::Success.code()),
        Err(e) => {
            output.error(&e.to_string());
            let code = e.return_code();
            if code == ReturnCode::InvalidInvocation {
                eprint!("{}", explain_valid_jobs());
            }
            ExitCode::from(code.code())
        }
    }
}

/// RUST_LOG wins; otherwise info for this crate (debug with -v) and warn elsewhere.
fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.output_mode() == OutputMode::Normal {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,bluegreen={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    match &cli.command {
        Commands::Init { force } => commands::init(*force, output),
        Commands::Jobs => {
            commands::jobs();
            Ok(())
        }
        Commands::Run {
            job,
            env,
            live_env,
            noop,
            force_lock,
        } => {
            let request = JobRequest {
                job: *job,
                env: env.clone(),
                live_env: live_env.clone(),
            };
            // Invocation errors take precedence over configuration problems.
            request.validate()?;
            let config = load_config(&cli)?;
            commands::run_job(
                &config,
                request,
                *noop,
                *force_lock,
                Output::new(output.mode()),
            )
            .await
        }
        Commands::Show { env } => {
            let config = load_config(&cli)?;
            commands::show(&config, env, output)
        }
    }
}
