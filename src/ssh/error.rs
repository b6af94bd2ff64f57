// ABOUTME: Failures talking to the VM-creation host over SSH.
// ABOUTME: Transport only; what a command printed is never an error here.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot reach {0}")]
    Connection(String),

    #[error("host rejected every offered key")]
    AuthenticationFailed,

    #[error("no usable credentials: {0}")]
    AgentUnavailable(String),

    #[error("cannot load private key {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("remote command not started: {0}")]
    CommandFailed(String),

    #[error("remote command still running after {0:?}")]
    CommandTimeout(Duration),

    #[error("channel closed before the command reported an exit status")]
    ChannelClosed,

    #[error(transparent)]
    Protocol(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
