// ABOUTME: Progress checker for VM creation started by a command run over SSH.
// ABOUTME: Reads hostname/ip from the kickoff output, then polls a followup command.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SshVmCreateConfig;
use crate::model::ApplicationVm;
use crate::ssh::{RemoteShell, VAR_HOSTNAME};
use crate::wait::lines::{any_line_matches, first_capture};
use crate::wait::{ProgressChecker, WaitError};

const HYPHEN_LINE: &str = "----------------------------------------------------------------------";

pub struct SshVmCreateProgressChecker {
    initial_output: String,
    log_context: String,
    shell: Arc<dyn RemoteShell>,
    config: SshVmCreateConfig,
    hostname: Option<String>,
    ip_address: Option<String>,
    done: bool,
    result: Option<ApplicationVm>,
}

impl std::fmt::Debug for SshVmCreateProgressChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshVmCreateProgressChecker")
            .field("hostname", &self.hostname)
            .field("ip_address", &self.ip_address)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl SshVmCreateProgressChecker {
    pub fn new(
        initial_output: impl Into<String>,
        log_context: impl Into<String>,
        shell: Arc<dyn RemoteShell>,
        config: SshVmCreateConfig,
    ) -> Self {
        Self {
            initial_output: initial_output.into(),
            log_context: log_context.into(),
            shell,
            config,
            hostname: None,
            ip_address: None,
            done: false,
            result: None,
        }
    }

    /// Hostname read from the kickoff output; `None` before `initial_check`.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    fn context(&self) -> String {
        format!(
            "{}SSH VM Creation for hostname '{}', ipAddress {}: ",
            self.log_context,
            self.hostname.as_deref().unwrap_or_default(),
            self.ip_address.as_deref().unwrap_or_default()
        )
    }

    fn required_capture(
        &self,
        capture: &'static str,
        pattern: &regex::Regex,
    ) -> Result<String, WaitError> {
        first_capture(&self.initial_output, pattern)
            .map(str::to_string)
            .ok_or_else(|| WaitError::MissingCapture {
                context: self.log_context.clone(),
                capture,
            })
    }
}

#[async_trait]
impl ProgressChecker for SshVmCreateProgressChecker {
    type Output = ApplicationVm;

    fn description(&self) -> String {
        format!("SSH VM Creation by {}", self.shell.target())
    }

    fn initial_check(&mut self) -> Result<(), WaitError> {
        if self.initial_output.trim().is_empty() {
            return Err(WaitError::BlankInitialOutput {
                description: self.description(),
            });
        }
        tracing::debug!(
            "Initial output from {}:\n{}\n{}{}",
            self.description(),
            HYPHEN_LINE,
            self.initial_output,
            HYPHEN_LINE
        );
        let hostname = self.required_capture("hostname", &self.config.initial_regexp_hostname)?;
        let ip_address =
            self.required_capture("ipAddress", &self.config.initial_regexp_ipaddress)?;
        self.hostname = Some(hostname);
        self.ip_address = Some(ip_address);
        tracing::info!("{}STARTED", self.context());
        Ok(())
    }

    async fn followup_check(&mut self, wait_number: u32) -> Result<(), WaitError> {
        let hostname = self.hostname.as_deref().unwrap_or_default();
        let command = self.config.followup_command.render(&[(VAR_HOSTNAME, hostname)]);
        let output = self
            .shell
            .exec_command(&command)
            .await
            .map_err(|e| WaitError::probe(self.context(), e))?;
        tracing::debug!("SSH VM Creation state after wait#{}: {}", wait_number, output);

        // Failure wins even when a success line is also present.
        if any_line_matches(&output, &self.config.followup_regexp_error) {
            return Err(WaitError::RemoteFailure {
                context: self.context(),
                detail: output.trim().to_string(),
            });
        }
        if any_line_matches(&output, &self.config.followup_regexp_done) {
            self.done = true;
            self.result = Some(ApplicationVm::new(
                self.hostname.clone().unwrap_or_default(),
                self.ip_address.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<ApplicationVm> {
        self.result.take()
    }

    fn timeout(&mut self) {
        tracing::error!("{}failed to become available prior to timeout", self.context());
    }
}
