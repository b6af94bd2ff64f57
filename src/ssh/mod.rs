// ABOUTME: SSH client module for the remote host that creates application VMs.
// ABOUTME: Supports SSH agent and key-based authentication with known_hosts verification.

mod client;
mod error;
mod shell;
mod template;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
pub use shell::{RemoteShell, ShellConnector, SshConnector};
pub use template::{CommandTemplate, VAR_ENV_NAME, VAR_HOSTNAME};
