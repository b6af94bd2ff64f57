// ABOUTME: Raw RDS control-plane operations and their AWS SDK implementation.
// ABOUTME: Describe calls return every match; policy on ambiguous matches lives in RdsCopier.

use async_trait::async_trait;
use aws_sdk_rds::error::DisplayErrorContext;
use snafu::OptionExt;

use super::error::{EmptyResponseSnafu, RdsError};
use super::types::{DbInstance, DbParameterGroup, DbSnapshot, Endpoint};

#[async_trait]
pub trait RdsApi: Send + Sync {
    /// Instances named `identifier`. Empty when none exist.
    async fn describe_instances(&self, identifier: &str) -> Result<Vec<DbInstance>, RdsError>;

    /// Snapshots named `identifier`. Empty when none exist.
    async fn describe_snapshots(&self, identifier: &str) -> Result<Vec<DbSnapshot>, RdsError>;

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance: &str,
    ) -> Result<DbSnapshot, RdsError>;

    async fn copy_parameter_group(
        &self,
        source: &str,
        target: &str,
        description: &str,
    ) -> Result<DbParameterGroup, RdsError>;

    async fn restore_instance_from_snapshot(
        &self,
        instance: &str,
        snapshot_id: &str,
    ) -> Result<DbInstance, RdsError>;

    async fn modify_instance(
        &self,
        instance: &str,
        security_group_ids: &[String],
        parameter_group: &str,
    ) -> Result<DbInstance, RdsError>;
}

/// RDS reached through the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsRds {
    client: aws_sdk_rds::Client,
}

impl AwsRds {
    /// Build a client for `region` using the default credential chain.
    ///
    /// Credentials are resolved on first use, not here.
    pub async fn connect(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self {
            client: aws_sdk_rds::Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: aws_sdk_rds::Client) -> Self {
        Self { client }
    }
}

fn api_error<E>(operation: &'static str, err: E) -> RdsError
where
    E: std::error::Error,
{
    RdsError::Api {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn instance_from_sdk(instance: &aws_sdk_rds::types::DbInstance) -> DbInstance {
    DbInstance {
        identifier: instance
            .db_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        status: instance.db_instance_status().unwrap_or_default().to_string(),
        endpoint: instance.endpoint().and_then(|endpoint| {
            Some(Endpoint {
                address: endpoint.address()?.to_string(),
                port: u16::try_from(endpoint.port()?).ok()?,
            })
        }),
        parameter_groups: instance
            .db_parameter_groups()
            .iter()
            .filter_map(|group| group.db_parameter_group_name().map(str::to_string))
            .collect(),
        vpc_security_group_ids: instance
            .vpc_security_groups()
            .iter()
            .filter_map(|group| group.vpc_security_group_id().map(str::to_string))
            .collect(),
    }
}

fn snapshot_from_sdk(snapshot: &aws_sdk_rds::types::DbSnapshot) -> DbSnapshot {
    DbSnapshot {
        identifier: snapshot
            .db_snapshot_identifier()
            .unwrap_or_default()
            .to_string(),
        instance_identifier: snapshot
            .db_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        status: snapshot.status().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl RdsApi for AwsRds {
    async fn describe_instances(&self, identifier: &str) -> Result<Vec<DbInstance>, RdsError> {
        match self
            .client
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await
        {
            Ok(output) => Ok(output.db_instances().iter().map(instance_from_sdk).collect()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_instance_not_found_fault()) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(api_error("describeDBInstances", err)),
        }
    }

    async fn describe_snapshots(&self, identifier: &str) -> Result<Vec<DbSnapshot>, RdsError> {
        match self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(identifier)
            .send()
            .await
        {
            Ok(output) => Ok(output.db_snapshots().iter().map(snapshot_from_sdk).collect()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_snapshot_not_found_fault()) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(api_error("describeDBSnapshots", err)),
        }
    }

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance: &str,
    ) -> Result<DbSnapshot, RdsError> {
        const OPERATION: &str = "createDBSnapshot";
        let output = self
            .client
            .create_db_snapshot()
            .db_snapshot_identifier(snapshot_id)
            .db_instance_identifier(instance)
            .send()
            .await
            .map_err(|e| api_error(OPERATION, e))?;
        output.db_snapshot().map(snapshot_from_sdk).context(EmptyResponseSnafu {
            operation: OPERATION,
            what: "snapshot",
        })
    }

    async fn copy_parameter_group(
        &self,
        source: &str,
        target: &str,
        description: &str,
    ) -> Result<DbParameterGroup, RdsError> {
        const OPERATION: &str = "copyDBParameterGroup";
        let output = self
            .client
            .copy_db_parameter_group()
            .source_db_parameter_group_identifier(source)
            .target_db_parameter_group_identifier(target)
            .target_db_parameter_group_description(description)
            .send()
            .await
            .map_err(|e| api_error(OPERATION, e))?;
        let group = output.db_parameter_group().context(EmptyResponseSnafu {
            operation: OPERATION,
            what: "parameter group",
        })?;
        Ok(DbParameterGroup {
            name: group
                .db_parameter_group_name()
                .unwrap_or_default()
                .to_string(),
            family: group
                .db_parameter_group_family()
                .unwrap_or_default()
                .to_string(),
            description: group.description().unwrap_or_default().to_string(),
        })
    }

    async fn restore_instance_from_snapshot(
        &self,
        instance: &str,
        snapshot_id: &str,
    ) -> Result<DbInstance, RdsError> {
        const OPERATION: &str = "restoreDBInstanceFromDBSnapshot";
        let output = self
            .client
            .restore_db_instance_from_db_snapshot()
            .db_instance_identifier(instance)
            .db_snapshot_identifier(snapshot_id)
            .send()
            .await
            .map_err(|e| api_error(OPERATION, e))?;
        output.db_instance().map(instance_from_sdk).context(EmptyResponseSnafu {
            operation: OPERATION,
            what: "instance",
        })
    }

    async fn modify_instance(
        &self,
        instance: &str,
        security_group_ids: &[String],
        parameter_group: &str,
    ) -> Result<DbInstance, RdsError> {
        const OPERATION: &str = "modifyDBInstance";
        let output = self
            .client
            .modify_db_instance()
            .db_instance_identifier(instance)
            .set_vpc_security_group_ids(Some(security_group_ids.to_vec()))
            .db_parameter_group_name(parameter_group)
            .send()
            .await
            .map_err(|e| api_error(OPERATION, e))?;
        output.db_instance().map(instance_from_sdk).context(EmptyResponseSnafu {
            operation: OPERATION,
            what: "instance",
        })
    }
}
