// ABOUTME: Logical and physical database entities of an environment's data tier.
// ABOUTME: A logical database is backed by one physical instance at a time.

use serde::{Deserialize, Serialize};

use crate::types::{LogicalDatabaseId, PhysicalDatabaseId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Managed instance in Amazon RDS.
    Rds,
}

/// One managed database instance, 1:1 with a control-plane resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDatabase {
    #[serde(default)]
    id: PhysicalDatabaseId,
    db_type: DatabaseType,
    instance_name: String,
    #[serde(default)]
    live: bool,
    #[serde(default)]
    url: Option<String>,
}

impl PhysicalDatabase {
    pub fn rds(instance_name: impl Into<String>, live: bool) -> Self {
        Self {
            id: PhysicalDatabaseId::unassigned(),
            db_type: DatabaseType::Rds,
            instance_name: instance_name.into(),
            live,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn id(&self) -> PhysicalDatabaseId {
        self.id
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// A named database tier that survives blue/green swaps of its physical instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalDatabase {
    #[serde(default)]
    id: LogicalDatabaseId,
    logical_name: String,
    #[serde(default)]
    physical_database: Option<PhysicalDatabase>,
}

impl LogicalDatabase {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            id: LogicalDatabaseId::unassigned(),
            logical_name: logical_name.into(),
            physical_database: None,
        }
    }

    pub fn id(&self) -> LogicalDatabaseId {
        self.id
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn physical_database(&self) -> Option<&PhysicalDatabase> {
        self.physical_database.as_ref()
    }

    pub fn replace_physical_database(
        &mut self,
        physical: PhysicalDatabase,
    ) -> Option<PhysicalDatabase> {
        self.physical_database.replace(physical)
    }

    pub(crate) fn assign_identities(&mut self, next_id: &mut impl FnMut() -> u64) {
        if !self.id.is_assigned() {
            self.id = LogicalDatabaseId::new(next_id());
        }
        if let Some(physical) = self.physical_database.as_mut()
            && !physical.id.is_assigned()
        {
            physical.id = PhysicalDatabaseId::new(next_id());
        }
    }
}
