// ABOUTME: Task contract: one orchestration step of a job against a single environment.
// ABOUTME: Tasks either preview (noop) or act, wait, and persist through EnvironmentTx.

mod error;
mod rds_snapshot_restore;
mod register_application;
mod ssh_vm_create;
mod ssh_vm_progress;

pub use error::TaskError;
pub use rds_snapshot_restore::{RdsSnapshotRestoreTask, RestoreNames};
pub use register_application::RegisterApplicationTask;
pub use ssh_vm_create::SshVmCreateTask;
pub use ssh_vm_progress::SshVmCreateProgressChecker;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::types::EnvName;
use crate::wait::{ProgressChecker, Sleeper, WaitConfig, WaitOutcome, Waiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Noop,
    Done,
    Error,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Noop => "NOOP",
            TaskStatus::Done => "DONE",
            TaskStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Environment and 1-based position of a task within its job.
///
/// Displays as the log prefix `[envName#position]: `.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    env_name: EnvName,
    position: usize,
}

impl TaskContext {
    pub fn new(env_name: EnvName, position: usize) -> Self {
        Self { env_name, position }
    }

    pub fn env_name(&self) -> &EnvName {
        &self.env_name
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}#{}]: ", self.env_name, self.position)
    }
}

pub fn noop_remark(noop: bool) -> &'static str {
    if noop { " (noop)" } else { "" }
}

#[async_trait]
pub trait Task: Send {
    fn name(&self) -> &'static str;

    fn context(&self) -> &TaskContext;

    /// Preview (`noop`) or perform this step.
    ///
    /// With `noop` nothing is persisted and no mutating external call is made.
    /// A step that cannot complete returns an error rather than a status.
    async fn process(&mut self, noop: bool) -> Result<TaskStatus, TaskError>;
}

/// Validate the kickoff output, then poll until done.
///
/// A timeout is fatal here: a resource that never became available cannot
/// be used by later steps.
pub(crate) async fn wait_for<C>(
    context: &TaskContext,
    config: WaitConfig,
    sleeper: Arc<dyn Sleeper>,
    mut checker: C,
) -> Result<C::Output, TaskError>
where
    C: ProgressChecker,
{
    checker.initial_check()?;
    let description = checker.description();
    tracing::info!("{}Waiting for {} to become available", context, description);
    match Waiter::new(config, sleeper, checker).wait_until_done().await? {
        WaitOutcome::Done(output) => Ok(output),
        WaitOutcome::TimedOut { .. } => Err(TaskError::NotAvailable {
            context: context.to_string(),
            description,
        }),
    }
}
