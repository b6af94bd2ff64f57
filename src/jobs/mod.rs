// ABOUTME: Jobs: ordered task sequences bound to one environment.
// ABOUTME: Tasks run strictly in order; the first failure stops the job with no rollback.

mod factory;

pub use factory::{Collaborators, JobFactory, JobName, JobRequest, explain_valid_jobs};

use nonempty::NonEmpty;
use serde::Serialize;
use thiserror::Error;

use crate::tasks::{Task, TaskError, TaskStatus};
use crate::types::EnvName;

/// What one task did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub position: usize,
    pub name: &'static str,
    pub status: TaskStatus,
}

/// Aggregate result of a job that ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job: JobName,
    pub environment: EnvName,
    pub noop: bool,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Error)]
pub enum JobError {
    /// `records` holds every task that ran, the failed one last with status `Error`.
    #[error("[{env}#{position}]: {task} failed: {source}")]
    TaskFailed {
        env: EnvName,
        position: usize,
        task: &'static str,
        records: Vec<TaskRecord>,
        #[source]
        source: TaskError,
    },
}

impl JobError {
    pub fn position(&self) -> usize {
        match self {
            JobError::TaskFailed { position, .. } => *position,
        }
    }

    pub fn records(&self) -> &[TaskRecord] {
        match self {
            JobError::TaskFailed { records, .. } => records,
        }
    }
}

pub struct Job {
    name: JobName,
    env_name: EnvName,
    tasks: NonEmpty<Box<dyn Task>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("env_name", &self.env_name)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl Job {
    pub fn new(name: JobName, env_name: EnvName, tasks: NonEmpty<Box<dyn Task>>) -> Self {
        Self {
            name,
            env_name,
            tasks,
        }
    }

    pub fn name(&self) -> JobName {
        self.name
    }

    pub fn env_name(&self) -> &EnvName {
        &self.env_name
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Run every task in position order, stopping at the first failure.
    ///
    /// Effects already persisted by earlier tasks are kept.
    pub async fn process(&mut self, noop: bool) -> Result<JobOutcome, JobError> {
        tracing::info!(
            "[{}]: Job '{}' starting {} task(s){}",
            self.env_name,
            self.name,
            self.tasks.len(),
            crate::tasks::noop_remark(noop)
        );

        let mut records = Vec::with_capacity(self.tasks.len());
        for task in self.tasks.iter_mut() {
            let position = task.context().position();
            let name = task.name();
            match task.process(noop).await {
                Ok(status) => {
                    tracing::info!("{}{} {}", task.context(), name, status);
                    records.push(TaskRecord {
                        position,
                        name,
                        status,
                    });
                }
                Err(source) => {
                    tracing::error!("{}{} failed: {}", task.context(), name, source);
                    records.push(TaskRecord {
                        position,
                        name,
                        status: TaskStatus::Error,
                    });
                    return Err(JobError::TaskFailed {
                        env: self.env_name.clone(),
                        position,
                        task: name,
                        records,
                        source,
                    });
                }
            }
        }

        tracing::info!("[{}]: Job '{}' finished", self.env_name, self.name);
        Ok(JobOutcome {
            job: self.name,
            environment: self.env_name.clone(),
            noop,
            tasks: records,
        })
    }
}
