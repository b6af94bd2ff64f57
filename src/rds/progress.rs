// ABOUTME: Progress checkers for RDS instance and snapshot state transitions.
// ABOUTME: Done on "available"; terminal failure statuses abort the wait immediately.

use async_trait::async_trait;

use super::copier::RdsCopier;
use super::types::{DbInstance, DbSnapshot};
use crate::wait::{ProgressChecker, WaitError};

/// Instance statuses from which RDS never reaches "available" on its own.
const INSTANCE_FAILURE_STATUSES: &[&str] = &[
    "failed",
    "incompatible-restore",
    "incompatible-parameters",
    "incompatible-network",
    "incompatible-option-group",
    "storage-full",
    "inaccessible-encryption-credentials",
    "restore-error",
];

const SNAPSHOT_FAILURE_STATUSES: &[&str] = &["failed", "error"];

/// Waits for an RDS instance to become available after a restore or modify.
#[derive(Debug)]
pub struct RdsInstanceProgressChecker {
    copier: RdsCopier,
    log_context: String,
    initial: DbInstance,
    result: Option<DbInstance>,
    done: bool,
}

impl RdsInstanceProgressChecker {
    /// `initial` is the instance description returned by the kickoff call.
    pub fn new(copier: RdsCopier, log_context: impl Into<String>, initial: DbInstance) -> Self {
        Self {
            copier,
            log_context: log_context.into(),
            initial,
            result: None,
            done: false,
        }
    }

    fn context(&self) -> String {
        format!("{}RDS instance '{}': ", self.log_context, self.initial.identifier)
    }

    fn check_status(&self, status: &str) -> Result<(), WaitError> {
        if INSTANCE_FAILURE_STATUSES.contains(&status) {
            return Err(WaitError::RemoteFailure {
                context: self.context(),
                detail: format!("instance status '{status}'"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressChecker for RdsInstanceProgressChecker {
    type Output = DbInstance;

    fn description(&self) -> String {
        format!("RDS instance '{}'", self.initial.identifier)
    }

    fn initial_check(&mut self) -> Result<(), WaitError> {
        if self.initial.identifier.trim().is_empty() {
            return Err(WaitError::MissingCapture {
                context: self.log_context.clone(),
                capture: "instance identifier",
            });
        }
        self.check_status(&self.initial.status)?;
        tracing::info!("{}STARTED (status '{}')", self.context(), self.initial.status);
        Ok(())
    }

    async fn followup_check(&mut self, wait_number: u32) -> Result<(), WaitError> {
        let instance = self
            .copier
            .describe_instance(&self.initial.identifier)
            .await
            .map_err(|e| WaitError::probe(self.context(), e))?;
        tracing::debug!(
            "RDS instance '{}' status after wait#{}: {}",
            instance.identifier,
            wait_number,
            instance.status
        );
        self.check_status(&instance.status)?;
        if instance.is_available() {
            self.done = true;
            self.result = Some(instance);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<DbInstance> {
        self.result.take()
    }

    fn timeout(&mut self) {
        tracing::error!("{}failed to become available prior to timeout", self.context());
    }
}

/// Waits for an RDS snapshot to become available.
#[derive(Debug)]
pub struct RdsSnapshotProgressChecker {
    copier: RdsCopier,
    log_context: String,
    initial: DbSnapshot,
    result: Option<DbSnapshot>,
    done: bool,
}

impl RdsSnapshotProgressChecker {
    pub fn new(copier: RdsCopier, log_context: impl Into<String>, initial: DbSnapshot) -> Self {
        Self {
            copier,
            log_context: log_context.into(),
            initial,
            result: None,
            done: false,
        }
    }

    fn context(&self) -> String {
        format!("{}RDS snapshot '{}': ", self.log_context, self.initial.identifier)
    }

    fn check_status(&self, status: &str) -> Result<(), WaitError> {
        if SNAPSHOT_FAILURE_STATUSES.contains(&status) {
            return Err(WaitError::RemoteFailure {
                context: self.context(),
                detail: format!("snapshot status '{status}'"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressChecker for RdsSnapshotProgressChecker {
    type Output = DbSnapshot;

    fn description(&self) -> String {
        format!("RDS snapshot '{}'", self.initial.identifier)
    }

    fn initial_check(&mut self) -> Result<(), WaitError> {
        if self.initial.identifier.trim().is_empty() {
            return Err(WaitError::MissingCapture {
                context: self.log_context.clone(),
                capture: "snapshot identifier",
            });
        }
        self.check_status(&self.initial.status)?;
        tracing::info!("{}STARTED (status '{}')", self.context(), self.initial.status);
        Ok(())
    }

    async fn followup_check(&mut self, wait_number: u32) -> Result<(), WaitError> {
        let snapshot = self
            .copier
            .describe_snapshot(&self.initial.identifier)
            .await
            .map_err(|e| WaitError::probe(self.context(), e))?;
        tracing::debug!(
            "RDS snapshot '{}' status after wait#{}: {}",
            snapshot.identifier,
            wait_number,
            snapshot.status
        );
        self.check_status(&snapshot.status)?;
        if snapshot.is_available() {
            self.done = true;
            self.result = Some(snapshot);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<DbSnapshot> {
        self.result.take()
    }

    fn timeout(&mut self) {
        tracing::error!("{}failed to become available prior to timeout", self.context());
    }
}
