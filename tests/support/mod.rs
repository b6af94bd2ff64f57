// ABOUTME: Test support utilities.
// ABOUTME: Scripted fakes for the remote shell, sleeper and RDS API seams.

use async_trait::async_trait;
use bluegreen::config::SshVmCreateConfig;
use bluegreen::rds::{DbInstance, DbParameterGroup, DbSnapshot, Endpoint, RdsApi, RdsError};
use bluegreen::ssh::{self, RemoteShell, ShellConnector};
use bluegreen::types::EnvName;
use bluegreen::wait::{Sleeper, WaitConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("bluegreen=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn env(name: &str) -> EnvName {
    EnvName::new(name).unwrap()
}

/// A wait budget that never really sleeps.
#[allow(dead_code)]
pub fn quick_wait(max_num_waits: u32) -> WaitConfig {
    WaitConfig {
        max_num_waits,
        report_interval: 2,
        delay: Duration::from_secs(30),
    }
}

/// The persisted form of `environment` with every `id` field removed, so
/// aggregates saved through different histories can be compared.
#[allow(dead_code)]
pub fn without_ids(environment: &bluegreen::model::Environment) -> serde_json::Value {
    fn strip(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(fields) => {
                fields.remove("id");
                fields.values_mut().for_each(strip);
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }
    let mut value = serde_json::to_value(environment).unwrap();
    strip(&mut value);
    value
}

#[allow(dead_code)]
pub fn vm_create_config(max_num_waits: u32) -> SshVmCreateConfig {
    let yaml = r#"
initial_command: "vmtool create --env ${envName}"
followup_command: "vmtool status ${hostname}"
initial_regexp_hostname: "creating (\\S+) at"
initial_regexp_ipaddress: "at (\\d+\\.\\d+\\.\\d+\\.\\d+)"
followup_regexp_done: "^READY"
followup_regexp_error: "ERROR"
"#;
    let mut config: SshVmCreateConfig = serde_yaml::from_str(yaml).unwrap();
    config.wait = quick_wait(max_num_waits);
    config
}

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Replies to commands from a script; the last reply repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedShell {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    commands: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedShell {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            commands: Mutex::new(Vec::new()),
        })
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn exec_command(&self, command: &str) -> ssh::Result<String> {
        self.commands.lock().push(command.to_string());
        let reply = match self.replies.lock().pop_front() {
            Some(reply) => {
                *self.last.lock() = reply.clone();
                reply
            }
            None => self.last.lock().clone(),
        };
        Ok(reply)
    }

    fn target(&self) -> String {
        "ops@vmhost".to_string()
    }
}

/// Hands out one shared shell and counts how often it was asked to.
pub struct FakeConnector {
    shell: Arc<ScriptedShell>,
    connects: AtomicUsize,
}

#[allow(dead_code)]
impl FakeConnector {
    pub fn new(shell: Arc<ScriptedShell>) -> Arc<Self> {
        Arc::new(Self {
            shell,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShellConnector for FakeConnector {
    async fn connect(&self) -> ssh::Result<Arc<dyn RemoteShell>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.shell.clone())
    }

    fn target(&self) -> String {
        self.shell.target()
    }
}

/// An RDS account holding one live instance.
///
/// Snapshots and restored instances walk through scripted statuses on each describe.
pub struct ScriptedRdsApi {
    live: DbInstance,
    snapshot_statuses: Mutex<VecDeque<&'static str>>,
    instance_statuses: Mutex<VecDeque<&'static str>>,
    restored: Mutex<Option<DbInstance>>,
    snapshot: Mutex<Option<DbSnapshot>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedRdsApi {
    pub fn new(live: DbInstance) -> Arc<Self> {
        Arc::new(Self {
            live,
            snapshot_statuses: Mutex::new(VecDeque::new()),
            instance_statuses: Mutex::new(VecDeque::new()),
            restored: Mutex::new(None),
            snapshot: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script_snapshot(&self, statuses: &[&'static str]) {
        self.snapshot_statuses.lock().extend(statuses);
    }

    pub fn script_instance(&self, statuses: &[&'static str]) {
        self.instance_statuses.lock().extend(statuses);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[allow(dead_code)]
pub fn live_instance(identifier: &str) -> DbInstance {
    let mut instance = DbInstance::new(identifier, "available");
    instance.parameter_groups = vec!["orders-params".to_string()];
    instance.vpc_security_group_ids = vec!["sg-live".to_string()];
    instance.endpoint = Some(Endpoint {
        address: format!("{identifier}.abc.rds.amazonaws.com"),
        port: 5432,
    });
    instance
}

#[async_trait]
impl RdsApi for ScriptedRdsApi {
    async fn describe_instances(&self, identifier: &str) -> Result<Vec<DbInstance>, RdsError> {
        self.record(format!("describe_instances {identifier}"));
        if identifier == self.live.identifier {
            return Ok(vec![self.live.clone()]);
        }
        let mut restored = self.restored.lock();
        let Some(instance) = restored.as_mut() else {
            return Ok(Vec::new());
        };
        if let Some(status) = self.instance_statuses.lock().pop_front() {
            instance.status = status.to_string();
        }
        if instance.is_available() {
            instance.endpoint = Some(Endpoint {
                address: format!("{identifier}.abc.rds.amazonaws.com"),
                port: 5432,
            });
        }
        Ok(vec![instance.clone()])
    }

    async fn describe_snapshots(&self, identifier: &str) -> Result<Vec<DbSnapshot>, RdsError> {
        self.record(format!("describe_snapshots {identifier}"));
        let mut snapshot = self.snapshot.lock();
        let Some(snapshot) = snapshot.as_mut() else {
            return Ok(Vec::new());
        };
        if let Some(status) = self.snapshot_statuses.lock().pop_front() {
            snapshot.status = status.to_string();
        }
        Ok(vec![snapshot.clone()])
    }

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance: &str,
    ) -> Result<DbSnapshot, RdsError> {
        self.record(format!("create_snapshot {snapshot_id} {instance}"));
        let snapshot = DbSnapshot {
            identifier: snapshot_id.to_string(),
            instance_identifier: instance.to_string(),
            status: "creating".to_string(),
        };
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn copy_parameter_group(
        &self,
        source: &str,
        target: &str,
        description: &str,
    ) -> Result<DbParameterGroup, RdsError> {
        self.record(format!("copy_parameter_group {source} {target}"));
        Ok(DbParameterGroup {
            name: target.to_string(),
            family: "postgres16".to_string(),
            description: description.to_string(),
        })
    }

    async fn restore_instance_from_snapshot(
        &self,
        instance: &str,
        snapshot_id: &str,
    ) -> Result<DbInstance, RdsError> {
        self.record(format!("restore {instance} {snapshot_id}"));
        let restored = DbInstance::new(instance, "creating");
        *self.restored.lock() = Some(restored.clone());
        Ok(restored)
    }

    async fn modify_instance(
        &self,
        instance: &str,
        security_group_ids: &[String],
        parameter_group: &str,
    ) -> Result<DbInstance, RdsError> {
        self.record(format!(
            "modify {instance} [{}] {parameter_group}",
            security_group_ids.join(",")
        ));
        let mut restored = self.restored.lock();
        let Some(current) = restored.as_mut() else {
            return Err(RdsError::InstanceNotFound {
                instance: instance.to_string(),
            });
        };
        current.status = "modifying".to_string();
        current.parameter_groups = vec![parameter_group.to_string()];
        current.vpc_security_group_ids = security_group_ids.to_vec();
        Ok(current.clone())
    }
}
