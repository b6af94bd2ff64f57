// ABOUTME: Remote-shell seam used by tasks and progress checkers.
// ABOUTME: Tasks connect lazily through a ShellConnector so dry runs never open a session.

use async_trait::async_trait;
use std::sync::Arc;

use super::client::{Session, SessionConfig};
use super::error::Result;

/// Executes commands on a remote host and returns what they printed.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run `command` and return its output.
    ///
    /// Only transport problems are errors; a non-zero exit status is not.
    async fn exec_command(&self, command: &str) -> Result<String>;

    /// `user@host` of the remote end.
    fn target(&self) -> String;
}

#[async_trait]
impl RemoteShell for Session {
    async fn exec_command(&self, command: &str) -> Result<String> {
        tracing::debug!("Executing over ssh on {}: {}", self.config().target(), command);
        let output = self.exec(command).await?;
        if !output.success() {
            tracing::debug!(
                exit_code = output.exit_code,
                "Command on {} exited non-zero",
                self.config().target()
            );
        }
        Ok(output.combined())
    }

    fn target(&self) -> String {
        self.config().target()
    }
}

/// Opens remote-shell sessions.
#[async_trait]
pub trait ShellConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn RemoteShell>>;

    /// `user@host` that `connect` will reach.
    fn target(&self) -> String;
}

/// Connects over SSH with a fixed session configuration.
#[derive(Debug, Clone)]
pub struct SshConnector {
    config: SessionConfig,
}

impl SshConnector {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ShellConnector for SshConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteShell>> {
        let session = Session::connect(self.config.clone()).await?;
        Ok(Arc::new(session))
    }

    fn target(&self) -> String {
        self.config.target()
    }
}
