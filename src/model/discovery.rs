// ABOUTME: Per-environment discovery outcome and the Lockable capability.
// ABOUTME: Lock failures are recorded as data so callers can aggregate them across targets.

use serde::Deserialize;

use super::database::PhysicalDatabase;

/// Anything that can report "this target failed to lock".
pub trait Lockable {
    fn is_lock_error(&self) -> bool;
}

/// Database discovery outcome returned by a blue/green application.
///
/// Ephemeral: never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    #[serde(default)]
    physical_database: Option<PhysicalDatabase>,
    #[serde(default)]
    lock_error: bool,
    #[serde(default)]
    discovery_error: Option<String>,
}

impl DiscoveryResult {
    pub fn found(physical_database: PhysicalDatabase) -> Self {
        Self {
            physical_database: Some(physical_database),
            ..Self::default()
        }
    }

    pub fn lock_failed() -> Self {
        Self {
            lock_error: true,
            ..Self::default()
        }
    }

    pub fn failed(discovery_error: impl Into<String>) -> Self {
        Self {
            discovery_error: Some(discovery_error.into()),
            ..Self::default()
        }
    }

    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn discovery_error(&self) -> Option<&str> {
        self.discovery_error.as_deref()
    }

    /// The discovered database, unless the target failed to lock or to discover.
    pub fn usable_physical_database(&self) -> Option<&PhysicalDatabase> {
        if self.lock_error || self.discovery_error.is_some() {
            return None;
        }
        self.physical_database.as_ref()
    }
}

impl Lockable for DiscoveryResult {
    fn is_lock_error(&self) -> bool {
        self.lock_error
    }
}

/// Names of the targets that failed to lock, gathered across heterogeneous results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockReport {
    failed: Vec<String>,
    checked: usize,
}

impl LockReport {
    pub fn collect<'a, I>(targets: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a dyn Lockable)>,
    {
        let mut report = Self::default();
        for (name, target) in targets {
            report.checked += 1;
            if target.is_lock_error() {
                report.failed.push(name.to_string());
            }
        }
        report
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn checked(&self) -> usize {
        self.checked
    }
}
