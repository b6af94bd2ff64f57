// ABOUTME: Task that stages a copy of the live environment's RDS database for the target environment.
// ABOUTME: Snapshot, copy parameter group, restore, modify, wait, then record the new instance.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Task, TaskContext, TaskError, TaskStatus, noop_remark, wait_for};
use crate::config::RdsConfig;
use crate::env::EnvironmentTx;
use crate::model::PhysicalDatabase;
use crate::rds::{RdsCopier, RdsInstanceProgressChecker, RdsSnapshotProgressChecker};
use crate::types::EnvName;
use crate::wait::Sleeper;

/// Names of everything the copy creates, derived from the live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreNames {
    pub snapshot: String,
    pub instance: String,
}

impl RestoreNames {
    pub fn new(live_instance: &str, env_name: &EnvName) -> Self {
        Self {
            snapshot: format!("{live_instance}-{env_name}-snapshot"),
            instance: format!("{live_instance}-{env_name}"),
        }
    }

    pub fn parameter_group(live_parameter_group: &str, env_name: &EnvName) -> String {
        format!("{live_parameter_group}-{env_name}")
    }
}

pub struct RdsSnapshotRestoreTask {
    context: TaskContext,
    live_env: EnvName,
    tx: EnvironmentTx,
    copier: RdsCopier,
    sleeper: Arc<dyn Sleeper>,
    config: RdsConfig,
}

impl RdsSnapshotRestoreTask {
    pub fn new(
        context: TaskContext,
        live_env: EnvName,
        tx: EnvironmentTx,
        copier: RdsCopier,
        sleeper: Arc<dyn Sleeper>,
        config: RdsConfig,
    ) -> Self {
        Self {
            context,
            live_env,
            tx,
            copier,
            sleeper,
            config,
        }
    }

    fn precondition(&self, reason: impl Into<String>) -> TaskError {
        TaskError::Precondition {
            context: self.context.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Task for RdsSnapshotRestoreTask {
    fn name(&self) -> &'static str {
        "RdsSnapshotRestoreTask"
    }

    fn context(&self) -> &TaskContext {
        &self.context
    }

    async fn process(&mut self, noop: bool) -> Result<TaskStatus, TaskError> {
        let env_name = self.context.env_name().clone();
        let live = self.tx.find_environment(&self.live_env)?;
        let (logical_name, live_instance) = match live.live_physical_database() {
            Some((logical, physical)) => (
                logical.logical_name().to_string(),
                physical.instance_name().to_string(),
            ),
            None => {
                return Err(self.precondition(format!(
                    "live environment '{}' has no live physical database",
                    self.live_env
                )));
            }
        };
        let names = RestoreNames::new(&live_instance, &env_name);

        tracing::info!(
            "{}Copying database '{}' ({}) of '{}' to '{}'{}",
            self.context,
            logical_name,
            live_instance,
            self.live_env,
            names.instance,
            noop_remark(noop)
        );
        if noop {
            tracing::info!(
                "{}Would snapshot as '{}', copy the parameter group with suffix '-{}', and restore as '{}'",
                self.context,
                names.snapshot,
                env_name,
                names.instance
            );
            return Ok(TaskStatus::Noop);
        }

        let mut environment = self.tx.find_or_new(&env_name)?;
        let ctx = self.context.to_string();

        let live_db = self.copier.describe_instance(&live_instance).await?;
        let Some(live_group) = live_db.parameter_group() else {
            return Err(self.precondition(format!(
                "live instance '{live_instance}' has no parameter group"
            )));
        };
        let parameter_group = RestoreNames::parameter_group(live_group, &env_name);

        let snapshot = self
            .copier
            .create_snapshot(&names.snapshot, &live_instance)
            .await?;
        wait_for(
            &self.context,
            self.config.snapshot_wait,
            self.sleeper.clone(),
            RdsSnapshotProgressChecker::new(self.copier.clone(), ctx.clone(), snapshot),
        )
        .await?;

        let group = self
            .copier
            .copy_parameter_group(live_group, &parameter_group)
            .await?;
        tracing::info!("{}Copied parameter group '{}'", self.context, group.name);

        let restored = self
            .copier
            .restore_instance_from_snapshot(&names.instance, &names.snapshot)
            .await?;
        wait_for(
            &self.context,
            self.config.instance_wait,
            self.sleeper.clone(),
            RdsInstanceProgressChecker::new(self.copier.clone(), ctx.clone(), restored),
        )
        .await?;

        let security_groups = if self.config.security_group_ids.is_empty() {
            live_db.vpc_security_group_ids.clone()
        } else {
            self.config.security_group_ids.clone()
        };
        let modified = self
            .copier
            .modify_instance_with_secgrp_paramgrp(&names.instance, &security_groups, &parameter_group)
            .await?;
        let available = wait_for(
            &self.context,
            self.config.instance_wait,
            self.sleeper.clone(),
            RdsInstanceProgressChecker::new(self.copier.clone(), ctx, modified),
        )
        .await?;

        let mut physical = PhysicalDatabase::rds(&names.instance, false);
        if let Some(url) = available.url() {
            physical = physical.with_url(url);
        }
        if let Some(previous) = environment.set_physical_database(&logical_name, physical) {
            tracing::warn!(
                "{}Replaced physical database '{}' of '{}'",
                self.context,
                previous.instance_name(),
                logical_name
            );
        }
        self.tx.update_environment(&mut environment)?;
        tracing::info!(
            "{}Database '{}' now backed by '{}'",
            self.context,
            logical_name,
            names.instance
        );
        Ok(TaskStatus::Done)
    }
}
