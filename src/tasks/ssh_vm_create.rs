// ABOUTME: Task that creates an application VM by running a command over SSH on a third-party host.
// ABOUTME: Waits for the VM to become available, then persists it in the target environment.

use async_trait::async_trait;
use std::sync::Arc;

use super::ssh_vm_progress::SshVmCreateProgressChecker;
use super::{Task, TaskContext, TaskError, TaskStatus, noop_remark, wait_for};
use crate::config::SshVmCreateConfig;
use crate::env::EnvironmentTx;
use crate::model::ApplicationVm;
use crate::ssh::{RemoteShell, ShellConnector, VAR_ENV_NAME};
use crate::wait::Sleeper;

pub struct SshVmCreateTask {
    context: TaskContext,
    tx: EnvironmentTx,
    connector: Arc<dyn ShellConnector>,
    sleeper: Arc<dyn Sleeper>,
    config: SshVmCreateConfig,
}

impl SshVmCreateTask {
    pub fn new(
        context: TaskContext,
        tx: EnvironmentTx,
        connector: Arc<dyn ShellConnector>,
        sleeper: Arc<dyn Sleeper>,
        config: SshVmCreateConfig,
    ) -> Self {
        Self {
            context,
            tx,
            connector,
            sleeper,
            config,
        }
    }

    async fn wait_til_vm_is_available(
        &self,
        shell: Arc<dyn RemoteShell>,
        initial_output: String,
    ) -> Result<ApplicationVm, TaskError> {
        let checker = SshVmCreateProgressChecker::new(
            initial_output,
            self.context.to_string(),
            shell,
            self.config.clone(),
        );
        wait_for(&self.context, self.config.wait, self.sleeper.clone(), checker).await
    }
}

#[async_trait]
impl Task for SshVmCreateTask {
    fn name(&self) -> &'static str {
        "SshVmCreateTask"
    }

    fn context(&self) -> &TaskContext {
        &self.context
    }

    async fn process(&mut self, noop: bool) -> Result<TaskStatus, TaskError> {
        let env_name = self.context.env_name().clone();
        let mut environment = self.tx.find_or_new(&env_name)?;
        let command = self
            .config
            .initial_command
            .render(&[(VAR_ENV_NAME, env_name.as_str())]);

        tracing::info!(
            "{}Executing vm-create command over ssh{}",
            self.context,
            noop_remark(noop)
        );
        if noop {
            tracing::info!(
                "{}Would run on {}: {}",
                self.context,
                self.connector.target(),
                command
            );
            return Ok(TaskStatus::Noop);
        }

        let shell = self.connector.connect().await?;
        let output = shell.exec_command(&command).await?;
        let vm = self.wait_til_vm_is_available(shell, output).await?;

        let hostname = vm.hostname().to_string();
        environment.attach_vm(vm);
        self.tx.update_environment(&mut environment)?;
        if let Some(saved) = environment.find_vm(&hostname) {
            tracing::info!(
                "{}Application vm '{}' ({}) saved with id {}",
                self.context,
                saved.hostname(),
                saved.ip_address(),
                saved.id()
            );
        }
        Ok(TaskStatus::Done)
    }
}
