// ABOUTME: Application-wide error types for bluegreen.
// ABOUTME: Maps every failure to a process return code: invalid invocation or processing error.

use std::path::PathBuf;
use thiserror::Error;

use crate::env::{LockError, StoreError};
use crate::jobs::JobError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("configuration has no '{0}' section")]
    MissingSection(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    InvalidInvocation(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success,
    ProcessingError,
    InvalidInvocation,
}

impl ReturnCode {
    pub fn code(self) -> u8 {
        match self {
            ReturnCode::Success => 0,
            ReturnCode::ProcessingError => 1,
            ReturnCode::InvalidInvocation => 2,
        }
    }
}

impl Error {
    pub fn return_code(&self) -> ReturnCode {
        match self {
            // The requested job cannot run with this configuration at all.
            Error::InvalidInvocation(_) | Error::MissingSection(_) => ReturnCode::InvalidInvocation,
            _ => ReturnCode::ProcessingError,
        }
    }
}
