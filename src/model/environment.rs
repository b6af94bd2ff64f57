// ABOUTME: Environment aggregate with its application VMs and hosted applications.
// ABOUTME: Applications compare by persisted identity only.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::ModelError;
use super::database::{LogicalDatabase, PhysicalDatabase};
use crate::types::{ApplicationId, EnvName, EnvironmentId, VmId};

/// One blue/green deployable slot: its VMs and its database tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default)]
    id: EnvironmentId,
    name: EnvName,
    #[serde(default)]
    application_vms: Vec<ApplicationVm>,
    #[serde(default)]
    logical_databases: Vec<LogicalDatabase>,
}

impl Environment {
    /// A transient environment with nothing attached.
    pub fn new(name: EnvName) -> Self {
        Self {
            id: EnvironmentId::unassigned(),
            name,
            application_vms: Vec::new(),
            logical_databases: Vec::new(),
        }
    }

    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    pub fn name(&self) -> &EnvName {
        &self.name
    }

    pub fn application_vms(&self) -> &[ApplicationVm] {
        &self.application_vms
    }

    pub fn application_vms_mut(&mut self) -> &mut [ApplicationVm] {
        &mut self.application_vms
    }

    pub fn logical_databases(&self) -> &[LogicalDatabase] {
        &self.logical_databases
    }

    /// Attach a VM to this environment, setting its back-reference.
    ///
    /// The attachment only becomes durable once the aggregate is saved.
    pub fn attach_vm(&mut self, mut vm: ApplicationVm) {
        vm.environment = Some(self.name.clone());
        self.application_vms.push(vm);
    }

    pub fn find_vm(&self, hostname: &str) -> Option<&ApplicationVm> {
        self.application_vms.iter().find(|vm| vm.hostname == hostname)
    }

    /// The first logical database backed by a physical instance marked live.
    pub fn live_physical_database(&self) -> Option<(&LogicalDatabase, &PhysicalDatabase)> {
        self.logical_databases.iter().find_map(|logical| {
            logical
                .physical_database()
                .filter(|physical| physical.is_live())
                .map(|physical| (logical, physical))
        })
    }

    pub fn physical_database(&self, logical_name: &str) -> Option<&PhysicalDatabase> {
        self.logical_databases
            .iter()
            .find(|logical| logical.logical_name() == logical_name)
            .and_then(LogicalDatabase::physical_database)
    }

    /// Back `logical_name` with `physical`, creating the logical database if needed.
    ///
    /// Returns the physical database it replaced, if any.
    pub fn set_physical_database(
        &mut self,
        logical_name: &str,
        physical: PhysicalDatabase,
    ) -> Option<PhysicalDatabase> {
        match self
            .logical_databases
            .iter_mut()
            .find(|logical| logical.logical_name() == logical_name)
        {
            Some(logical) => logical.replace_physical_database(physical),
            None => {
                let mut logical = LogicalDatabase::new(logical_name);
                logical.replace_physical_database(physical);
                self.logical_databases.push(logical);
                None
            }
        }
    }

    /// Give every unsaved entity in the aggregate an identity from `next_id`.
    pub(crate) fn assign_identities(&mut self, next_id: &mut impl FnMut() -> u64) {
        if !self.id.is_assigned() {
            self.id = EnvironmentId::new(next_id());
        }
        for vm in &mut self.application_vms {
            if !vm.id.is_assigned() {
                vm.id = VmId::new(next_id());
            }
            for app in &mut vm.applications {
                if !app.id.is_assigned() {
                    app.id = ApplicationId::new(next_id());
                }
            }
        }
        for logical in &mut self.logical_databases {
            logical.assign_identities(next_id);
        }
    }
}

/// A virtual machine hosting one or more applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationVm {
    #[serde(default)]
    id: VmId,
    hostname: String,
    ip_address: String,
    #[serde(default)]
    environment: Option<EnvName>,
    #[serde(default)]
    applications: Vec<Application>,
}

impl ApplicationVm {
    /// A transient VM, not yet attached to any environment.
    pub fn new(hostname: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            id: VmId::unassigned(),
            hostname: hostname.into(),
            ip_address: ip_address.into(),
            environment: None,
            applications: Vec::new(),
        }
    }

    pub fn id(&self) -> VmId {
        self.id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Name of the owning environment; `None` while the VM is transient.
    pub fn environment(&self) -> Option<&EnvName> {
        self.environment.as_ref()
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn attach_application(&mut self, application: Application) {
        self.applications.push(application);
    }
}

/// An HTTP-addressable service instance on an application VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    id: ApplicationId,
    scheme: String,
    port: u16,
    url_path: String,
}

impl Application {
    pub fn new(
        scheme: impl Into<String>,
        port: u16,
        url_path: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let scheme = scheme.into();
        let url_path = url_path.into();
        if scheme.trim().is_empty() {
            return Err(ModelError::BlankScheme);
        }
        if !url_path.starts_with('/') {
            return Err(ModelError::InvalidUrlPath(url_path));
        }
        Ok(Self {
            id: ApplicationId::unassigned(),
            scheme,
            port,
            url_path,
        })
    }

    /// Set the persisted identity, as a loader would.
    pub fn with_id(mut self, id: ApplicationId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ApplicationId {
        self.id
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// `scheme://hostname:port/urlPath` for this application on `vm`.
    pub fn uri_on(&self, vm: &ApplicationVm) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, vm.hostname, self.port, self.url_path
        )
    }
}

/// Saved applications are equal when their ids are, whatever their fields.
///
/// An unsaved application has no identity to compare yet, so it equals only
/// another unsaved application with the same scheme, port and path, and
/// never a saved one.
impl PartialEq for Application {
    fn eq(&self, other: &Self) -> bool {
        match (self.id.is_assigned(), other.id.is_assigned()) {
            (true, true) => self.id == other.id,
            (false, false) => {
                self.scheme == other.scheme
                    && self.port == other.port
                    && self.url_path == other.url_path
            }
            _ => false,
        }
    }
}

impl Eq for Application {}

impl Hash for Application {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.id.is_assigned() {
            self.id.hash(state);
        } else {
            (&self.scheme, self.port, &self.url_path).hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blue() -> EnvName {
        EnvName::new("blue").unwrap()
    }

    #[test]
    fn attach_vm_sets_back_reference() {
        let mut env = Environment::new(blue());
        let vm = ApplicationVm::new("host1.example.com", "10.0.0.5");
        assert!(vm.environment().is_none());

        env.attach_vm(vm);

        let attached = env.find_vm("host1.example.com").unwrap();
        assert_eq!(attached.environment(), Some(&blue()));
        assert!(!attached.id().is_assigned());
    }

    #[test]
    fn application_rejects_relative_path() {
        let err = Application::new("http", 8080, "status").unwrap_err();
        assert!(matches!(err, ModelError::InvalidUrlPath(p) if p == "status"));
    }

    #[test]
    fn application_rejects_blank_scheme() {
        assert!(matches!(
            Application::new("  ", 80, "/"),
            Err(ModelError::BlankScheme)
        ));
    }

    #[test]
    fn uri_uses_vm_hostname() {
        let vm = ApplicationVm::new("host1.example.com", "10.0.0.5");
        let app = Application::new("https", 8443, "/bluegreen").unwrap();
        assert_eq!(app.uri_on(&vm), "https://host1.example.com:8443/bluegreen");
    }

    #[test]
    fn assign_identities_only_touches_unsaved_entities() {
        let mut env = Environment::new(blue());
        let mut vm = ApplicationVm::new("h", "1.2.3.4");
        vm.attach_application(Application::new("http", 80, "/").unwrap());
        env.attach_vm(vm);

        let mut counter = 10;
        env.assign_identities(&mut || {
            counter += 1;
            counter
        });
        let vm_id = env.application_vms()[0].id();
        assert_eq!(env.id().get(), 11);
        assert_eq!(vm_id.get(), 12);

        env.assign_identities(&mut || 999);
        assert_eq!(env.id().get(), 11);
        assert_eq!(env.application_vms()[0].id(), vm_id);
    }

    #[test]
    fn set_physical_database_creates_then_replaces() {
        let mut env = Environment::new(blue());
        let first = PhysicalDatabase::rds("orders-blue", true);
        assert!(env.set_physical_database("orders", first).is_none());

        let second = PhysicalDatabase::rds("orders-blue-2", true);
        let replaced = env.set_physical_database("orders", second).unwrap();
        assert_eq!(replaced.instance_name(), "orders-blue");
        assert_eq!(env.logical_databases().len(), 1);

        let (logical, physical) = env.live_physical_database().unwrap();
        assert_eq!(logical.logical_name(), "orders");
        assert_eq!(physical.instance_name(), "orders-blue-2");
    }

    #[test]
    fn staged_database_is_not_live() {
        let mut env = Environment::new(blue());
        env.set_physical_database("reports", PhysicalDatabase::rds("reports-blue", false));
        assert!(env.live_physical_database().is_none());

        env.set_physical_database("orders", PhysicalDatabase::rds("orders-blue", true));
        let (logical, _) = env.live_physical_database().unwrap();
        assert_eq!(logical.logical_name(), "orders");
        assert_eq!(
            env.physical_database("reports").map(|p| p.instance_name()),
            Some("reports-blue")
        );
    }
}
