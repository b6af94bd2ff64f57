// ABOUTME: Maps job names to task sequences and wires each task's collaborators.
// ABOUTME: Rejects invalid invocations (missing or identical live environment) before any work.

use nonempty::NonEmpty;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::Job;
use crate::config::Config;
use crate::env::EnvironmentTx;
use crate::error::{Error, Result};
use crate::rds::RdsCopier;
use crate::ssh::ShellConnector;
use crate::tasks::{
    RdsSnapshotRestoreTask, RegisterApplicationTask, SshVmCreateTask, Task, TaskContext,
};
use crate::types::EnvName;
use crate::wait::Sleeper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum JobName {
    /// Create an application VM and register the application on it.
    SshVmCreate,
    /// Copy the live environment's database into the target environment.
    RdsCopy,
    /// Create a VM, register the application, and copy the database.
    StageEnv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    SshVmCreate,
    RegisterApplication,
    RdsSnapshotRestore,
}

impl JobName {
    pub const ALL: [JobName; 3] = [JobName::SshVmCreate, JobName::RdsCopy, JobName::StageEnv];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::SshVmCreate => "ssh-vm-create",
            JobName::RdsCopy => "rds-copy",
            JobName::StageEnv => "stage-env",
        }
    }

    fn task_kinds(&self) -> &'static [TaskKind] {
        match self {
            JobName::SshVmCreate => &[TaskKind::SshVmCreate, TaskKind::RegisterApplication],
            JobName::RdsCopy => &[TaskKind::RdsSnapshotRestore],
            JobName::StageEnv => &[
                TaskKind::SshVmCreate,
                TaskKind::RegisterApplication,
                TaskKind::RdsSnapshotRestore,
            ],
        }
    }

    pub fn needs_live_env(&self) -> bool {
        self.task_kinds().contains(&TaskKind::RdsSnapshotRestore)
    }

    pub fn needs_ssh(&self) -> bool {
        self.task_kinds().contains(&TaskKind::SshVmCreate)
    }

    pub fn needs_rds(&self) -> bool {
        self.task_kinds().contains(&TaskKind::RdsSnapshotRestore)
    }

    fn summary(&self) -> &'static str {
        match self {
            JobName::SshVmCreate => "create an application vm over ssh and register the application on it",
            JobName::RdsCopy => "snapshot the live database and restore a copy for the target environment",
            JobName::StageEnv => "ssh-vm-create followed by rds-copy",
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-readable list of every job and its arguments.
pub fn explain_valid_jobs() -> String {
    let mut text = String::from("Valid jobs:\n");
    for job in JobName::ALL {
        let args = if job.needs_live_env() {
            "--env <name> --live-env <name>"
        } else {
            "--env <name>"
        };
        text.push_str(&format!("  {:<14} {}  {}\n", job.as_str(), args, job.summary()));
    }
    text
}

/// A job invocation as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub job: JobName,
    pub env: EnvName,
    pub live_env: Option<EnvName>,
}

impl JobRequest {
    pub fn validate(&self) -> Result<()> {
        match (&self.live_env, self.job.needs_live_env()) {
            (None, true) => Err(Error::InvalidInvocation(format!(
                "job '{}' requires --live-env",
                self.job
            ))),
            (Some(live), true) if live == &self.env => Err(Error::InvalidInvocation(format!(
                "live environment '{live}' must differ from target environment"
            ))),
            (Some(_), false) => Err(Error::InvalidInvocation(format!(
                "job '{}' does not take --live-env",
                self.job
            ))),
            _ => Ok(()),
        }
    }
}

/// Everything tasks talk to. Built once per run.
#[derive(Clone)]
pub struct Collaborators {
    pub tx: EnvironmentTx,
    pub sleeper: Arc<dyn Sleeper>,
    pub connector: Option<Arc<dyn ShellConnector>>,
    pub rds: Option<RdsCopier>,
}

pub struct JobFactory<'a> {
    config: &'a Config,
    collaborators: Collaborators,
}

impl<'a> JobFactory<'a> {
    pub fn new(config: &'a Config, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn build(&self, request: &JobRequest) -> Result<Job> {
        request.validate()?;

        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        for (index, kind) in request.job.task_kinds().iter().enumerate() {
            let context = TaskContext::new(request.env.clone(), index + 1);
            tasks.push(self.make_task(*kind, context, request)?);
        }

        let tasks = NonEmpty::from_vec(tasks)
            .ok_or_else(|| Error::InvalidInvocation(format!("job '{}' has no tasks", request.job)))?;
        Ok(Job::new(request.job, request.env.clone(), tasks))
    }

    fn make_task(
        &self,
        kind: TaskKind,
        context: TaskContext,
        request: &JobRequest,
    ) -> Result<Box<dyn Task>> {
        let c = &self.collaborators;
        Ok(match kind {
            TaskKind::SshVmCreate => {
                let connector = c
                    .connector
                    .clone()
                    .ok_or(Error::MissingSection("ssh_target"))?;
                Box::new(SshVmCreateTask::new(
                    context,
                    c.tx.clone(),
                    connector,
                    c.sleeper.clone(),
                    self.config.ssh_vm_create()?.clone(),
                ))
            }
            TaskKind::RegisterApplication => Box::new(RegisterApplicationTask::new(
                context,
                c.tx.clone(),
                self.config.application()?,
            )),
            TaskKind::RdsSnapshotRestore => {
                let copier = c.rds.clone().ok_or(Error::MissingSection("rds"))?;
                let live_env = request.live_env.clone().ok_or_else(|| {
                    Error::InvalidInvocation(format!("job '{}' requires --live-env", request.job))
                })?;
                Box::new(RdsSnapshotRestoreTask::new(
                    context,
                    live_env,
                    c.tx.clone(),
                    copier,
                    c.sleeper.clone(),
                    self.config.rds()?.clone(),
                ))
            }
        })
    }
}
