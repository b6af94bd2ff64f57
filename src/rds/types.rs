// ABOUTME: Plain descriptions of RDS instances, snapshots and parameter groups.
// ABOUTME: Decoupled from the AWS SDK so tasks and tests never touch SDK types.

/// Instance status once a restore or modification has settled.
pub const STATUS_AVAILABLE: &str = "available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbInstance {
    pub identifier: String,
    pub status: String,
    pub endpoint: Option<Endpoint>,
    pub parameter_groups: Vec<String>,
    pub vpc_security_group_ids: Vec<String>,
}

impl DbInstance {
    pub fn new(identifier: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }

    /// The parameter group the instance currently uses.
    pub fn parameter_group(&self) -> Option<&str> {
        self.parameter_groups.first().map(String::as_str)
    }

    /// `address:port` once the instance has an endpoint.
    pub fn url(&self) -> Option<String> {
        self.endpoint
            .as_ref()
            .map(|e| format!("{}:{}", e.address, e.port))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbSnapshot {
    pub identifier: String,
    pub instance_identifier: String,
    pub status: String,
}

impl DbSnapshot {
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbParameterGroup {
    pub name: String,
    pub family: String,
    pub description: String,
}
