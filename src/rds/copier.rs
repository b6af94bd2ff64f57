// ABOUTME: Timed RDS client used by tasks to copy and tweak database instances.
// ABOUTME: Every call is timed and logged; describe calls enforce the single-match policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::api::RdsApi;
use super::error::RdsError;
use super::types::{DbInstance, DbParameterGroup, DbSnapshot};

const PARAM_GROUP_DESCRIPTION: &str = "Nonshared so we can toggle read_only param.";

/// Copies and tweaks RDS instances.
#[derive(Clone)]
pub struct RdsCopier {
    api: Arc<dyn RdsApi>,
}

impl std::fmt::Debug for RdsCopier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdsCopier").finish_non_exhaustive()
    }
}

async fn timed<T, F>(operation: &'static str, call: F) -> Result<T, RdsError>
where
    F: Future<Output = Result<T, RdsError>>,
{
    tracing::debug!("{operation} start");
    let started = Instant::now();
    let result = call.await;
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "{operation} finished"
    );
    result
}

/// First of `matches`, warning when the name was ambiguous.
fn single_match<T>(kind: &'static str, name: &str, mut matches: Vec<T>) -> Option<T> {
    if matches.len() > 1 {
        tracing::warn!(
            resource = kind,
            identifier = name,
            matches = matches.len(),
            "Expected 1 {kind} named '{name}', found {}; using the first",
            matches.len()
        );
    }
    if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    }
}

impl RdsCopier {
    pub fn new(api: Arc<dyn RdsApi>) -> Self {
        Self { api }
    }

    /// Describe the instance named `instance`. Fails if there is none.
    pub async fn describe_instance(&self, instance: &str) -> Result<DbInstance, RdsError> {
        let matches = timed("describeDBInstances", self.api.describe_instances(instance)).await?;
        single_match("instance", instance, matches).ok_or_else(|| RdsError::InstanceNotFound {
            instance: instance.to_string(),
        })
    }

    /// Describe the snapshot named `snapshot_id`. Fails if there is none.
    pub async fn describe_snapshot(&self, snapshot_id: &str) -> Result<DbSnapshot, RdsError> {
        let matches = timed("describeDBSnapshots", self.api.describe_snapshots(snapshot_id)).await?;
        single_match("snapshot", snapshot_id, matches).ok_or_else(|| {
            RdsError::SnapshotNotFound {
                snapshot: snapshot_id.to_string(),
            }
        })
    }

    pub async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance: &str,
    ) -> Result<DbSnapshot, RdsError> {
        timed(
            "createDBSnapshot",
            self.api.create_snapshot(snapshot_id, instance),
        )
        .await
    }

    /// Copy a parameter group so the copy can be changed independently.
    pub async fn copy_parameter_group(
        &self,
        source: &str,
        target: &str,
    ) -> Result<DbParameterGroup, RdsError> {
        timed(
            "copyDBParameterGroup",
            self.api
                .copy_parameter_group(source, target, PARAM_GROUP_DESCRIPTION),
        )
        .await
    }

    /// Restore a snapshot to a brand new instance.
    ///
    /// The new instance gets the default security group; otherwise it matches the snapshot.
    pub async fn restore_instance_from_snapshot(
        &self,
        instance: &str,
        snapshot_id: &str,
    ) -> Result<DbInstance, RdsError> {
        timed(
            "restoreDBInstanceFromDBSnapshot",
            self.api.restore_instance_from_snapshot(instance, snapshot_id),
        )
        .await
    }

    /// Apply new security groups and a new parameter group to the instance.
    pub async fn modify_instance_with_secgrp_paramgrp(
        &self,
        instance: &str,
        security_group_ids: &[String],
        parameter_group: &str,
    ) -> Result<DbInstance, RdsError> {
        timed(
            "modifyDBInstance",
            self.api
                .modify_instance(instance, security_group_ids, parameter_group),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rds::RdsErrorKind;
    use async_trait::async_trait;

    struct FixedInstances(Vec<DbInstance>);

    #[async_trait]
    impl RdsApi for FixedInstances {
        async fn describe_instances(&self, _: &str) -> Result<Vec<DbInstance>, RdsError> {
            Ok(self.0.clone())
        }

        async fn describe_snapshots(&self, _: &str) -> Result<Vec<DbSnapshot>, RdsError> {
            Ok(Vec::new())
        }

        async fn create_snapshot(&self, _: &str, _: &str) -> Result<DbSnapshot, RdsError> {
            unimplemented!()
        }

        async fn copy_parameter_group(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<DbParameterGroup, RdsError> {
            unimplemented!()
        }

        async fn restore_instance_from_snapshot(
            &self,
            _: &str,
            _: &str,
        ) -> Result<DbInstance, RdsError> {
            unimplemented!()
        }

        async fn modify_instance(
            &self,
            _: &str,
            _: &[String],
            _: &str,
        ) -> Result<DbInstance, RdsError> {
            unimplemented!()
        }
    }

    fn copier(instances: Vec<DbInstance>) -> RdsCopier {
        RdsCopier::new(Arc::new(FixedInstances(instances)))
    }

    #[tokio::test]
    async fn describe_instance_fails_when_nothing_matches() {
        let err = copier(vec![]).describe_instance("db-blue").await.unwrap_err();
        assert_eq!(err.kind(), RdsErrorKind::NotFound);
        assert!(err.to_string().contains("db-blue"));
    }

    #[tokio::test]
    async fn describe_instance_uses_first_of_several() {
        let instance = copier(vec![
            DbInstance::new("db-blue", "available"),
            DbInstance::new("db-blue", "modifying"),
        ])
        .describe_instance("db-blue")
        .await
        .unwrap();
        assert_eq!(instance.status, "available");
    }

    #[tokio::test]
    async fn describe_snapshot_fails_when_nothing_matches() {
        let err = copier(vec![])
            .describe_snapshot("db-blue-green-snapshot")
            .await
            .unwrap_err();
        assert!(matches!(err, RdsError::SnapshotNotFound { .. }));
    }
}
