// ABOUTME: Run command implementation.
// ABOUTME: Wires collaborators, takes the environment lock, and processes the requested job.

use bluegreen::config::Config;
use bluegreen::diagnostics::Diagnostics;
use bluegreen::env::{EnvironmentLock, EnvironmentTx, FileStore};
use bluegreen::error::{Error, Result};
use bluegreen::jobs::{Collaborators, JobFactory, JobOutcome, JobRequest};
use bluegreen::model::Lockable;
use bluegreen::output::Output;
use bluegreen::rds::{AwsRds, RdsCopier};
use bluegreen::ssh::{ShellConnector, SshConnector};
use bluegreen::wait::TokioSleeper;
use std::sync::Arc;

pub async fn run_job(
    config: &Config,
    request: JobRequest,
    noop: bool,
    force_lock: bool,
    mut output: Output,
) -> Result<()> {
    request.validate()?;
    output.start_timer();

    let collaborators = collaborators(config, &request).await?;
    let mut job = JobFactory::new(config, collaborators).build(&request)?;

    output.progress(&format!(
        "Running {} on '{}': {}{}",
        request.job,
        request.env,
        job.task_names().join(", "),
        if noop { " (noop)" } else { "" }
    ));

    let mut diag = Diagnostics::default();
    let result = if noop {
        job.process(true).await.map_err(Error::from)
    } else {
        EnvironmentLock::with_lock(
            &config.store.lock_dir,
            &request.env,
            force_lock,
            &mut diag,
            async { job.process(false).await.map_err(Error::from) },
        )
        .await
    };

    if let Err(Error::Lock(e)) = &result
        && e.is_lock_error()
    {
        output.warning(&format!(
            "'{}' is locked; use --force-lock only if the holder is gone",
            request.env
        ));
    }
    for warning in diag.warnings() {
        output.warning(&warning.to_string());
    }

    let outcome = result?;
    report(&outcome, &output);
    Ok(())
}

async fn collaborators(config: &Config, request: &JobRequest) -> Result<Collaborators> {
    let tx = EnvironmentTx::new(Arc::new(FileStore::new(&config.store.path)));

    let connector = match &config.ssh_target {
        Some(target) if request.job.needs_ssh() => {
            Some(Arc::new(SshConnector::new(target.session_config())) as Arc<dyn ShellConnector>)
        }
        _ => None,
    };

    let rds = match &config.rds {
        Some(rds) if request.job.needs_rds() => {
            let api = AwsRds::connect(rds.region.clone()).await;
            Some(RdsCopier::new(Arc::new(api)))
        }
        _ => None,
    };

    Ok(Collaborators {
        tx,
        sleeper: Arc::new(TokioSleeper),
        connector,
        rds,
    })
}

fn report(outcome: &JobOutcome, output: &Output) {
    for task in &outcome.tasks {
        output.progress(&format!("  {}. {} {}", task.position, task.name, task.status));
    }
    output.success(&format!(
        "Job {} on '{}' finished{}",
        outcome.job,
        outcome.environment,
        if outcome.noop { " (noop)" } else { "" }
    ));
}
