// ABOUTME: Errors that abort a task and therefore the rest of its job.
// ABOUTME: External failures are wrapped unchanged; tasks never downgrade them.

use thiserror::Error;

use crate::env::StoreError;
use crate::rds::RdsError;
use crate::wait::WaitError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("ssh: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("rds: {0}")]
    Rds(#[from] RdsError),

    #[error("environment store: {0}")]
    Store(#[from] StoreError),

    #[error("{context}{description} did not become available")]
    NotAvailable {
        context: String,
        description: String,
    },

    #[error("{context}{reason}")]
    Precondition { context: String, reason: String },
}
