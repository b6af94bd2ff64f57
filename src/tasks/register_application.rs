// ABOUTME: Task that registers the configured application on every VM of an environment.
// ABOUTME: VMs that already host an application are left alone.

use async_trait::async_trait;

use super::{Task, TaskContext, TaskError, TaskStatus, noop_remark};
use crate::env::{EnvironmentTx, Missing, StoreError};
use crate::model::Application;

pub struct RegisterApplicationTask {
    context: TaskContext,
    tx: EnvironmentTx,
    application: Application,
}

impl RegisterApplicationTask {
    pub fn new(context: TaskContext, tx: EnvironmentTx, application: Application) -> Self {
        Self {
            context,
            tx,
            application,
        }
    }

    fn describe_application(&self) -> String {
        format!(
            "{}://<vm>:{}{}",
            self.application.scheme(),
            self.application.port(),
            self.application.url_path()
        )
    }
}

#[async_trait]
impl Task for RegisterApplicationTask {
    fn name(&self) -> &'static str {
        "RegisterApplicationTask"
    }

    fn context(&self) -> &TaskContext {
        &self.context
    }

    async fn process(&mut self, noop: bool) -> Result<TaskStatus, TaskError> {
        let env_name = self.context.env_name().clone();
        tracing::info!(
            "{}Registering application {}{}",
            self.context,
            self.describe_application(),
            noop_remark(noop)
        );

        if noop {
            // VMs created earlier in the same dry run do not exist yet.
            match self.tx.find_environment(&env_name) {
                Ok(environment) => {
                    let pending = environment
                        .application_vms()
                        .iter()
                        .filter(|vm| vm.applications().is_empty())
                        .count();
                    tracing::info!(
                        "{}Would register on {} of {} vm(s), plus any created by earlier tasks",
                        self.context,
                        pending,
                        environment.application_vms().len()
                    );
                }
                Err(StoreError::NotFound(_)) => {
                    tracing::info!(
                        "{}Environment not persisted yet; would register on vms created by earlier tasks",
                        self.context
                    );
                }
                Err(e) => return Err(e.into()),
            }
            return Ok(TaskStatus::Noop);
        }

        let context = self.context.to_string();
        let application = self.application.clone();
        let mut registered = 0usize;
        let environment = self.tx.with_environment(&env_name, Missing::Fail, |env| {
            if env.application_vms().is_empty() {
                return Err(TaskError::Precondition {
                    context,
                    reason: "environment has no application vm to register on".to_string(),
                });
            }
            for vm in env.application_vms_mut() {
                if vm.applications().is_empty() {
                    vm.attach_application(application.clone());
                    registered += 1;
                }
            }
            Ok(())
        })?;

        for vm in environment.application_vms() {
            for app in vm.applications() {
                tracing::debug!("{}Application {} at {}", self.context, app.id(), app.uri_on(vm));
            }
        }
        tracing::info!(
            "{}Registered application on {} vm(s)",
            self.context,
            registered
        );
        Ok(TaskStatus::Done)
    }
}
