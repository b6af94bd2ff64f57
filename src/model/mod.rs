// ABOUTME: Domain model: environments, VMs, applications, databases, discovery results.
// ABOUTME: Entities carry phantom-typed identities assigned by the environment store.

mod database;
mod discovery;
mod environment;

pub use database::{DatabaseType, LogicalDatabase, PhysicalDatabase};
pub use discovery::{DiscoveryResult, LockReport, Lockable};
pub use environment::{Application, ApplicationVm, Environment};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("application url path must begin with '/': {0}")]
    InvalidUrlPath(String),

    #[error("application scheme cannot be blank")]
    BlankScheme,
}
