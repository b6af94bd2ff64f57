// ABOUTME: Integration tests for staging a database copy through a scripted RDS account.
// ABOUTME: Walks snapshot, parameter group copy, restore and modify, then checks what was recorded.

mod support;

use bluegreen::config::RdsConfig;
use bluegreen::env::{EnvironmentStore, EnvironmentTx, MemoryStore, StoreError};
use bluegreen::model::{Environment, PhysicalDatabase};
use bluegreen::rds::{RdsCopier, RdsError};
use bluegreen::tasks::{RdsSnapshotRestoreTask, Task, TaskContext, TaskError, TaskStatus};
use bluegreen::wait::WaitError;
use std::sync::Arc;
use support::{
    RecordingSleeper, ScriptedRdsApi, env, live_instance, quick_wait, without_ids,
};

struct Harness {
    store: Arc<MemoryStore>,
    api: Arc<ScriptedRdsApi>,
    sleeper: Arc<RecordingSleeper>,
}

impl Harness {
    fn new() -> Self {
        support::init_tracing();
        let store = Arc::new(MemoryStore::new());
        let mut blue = Environment::new(env("blue"));
        blue.set_physical_database("orders", PhysicalDatabase::rds("orders-db", true));
        store.insert(&blue);
        Self {
            store,
            api: ScriptedRdsApi::new(live_instance("orders-db")),
            sleeper: RecordingSleeper::new(),
        }
    }

    fn task(&self, security_group_ids: &[&str]) -> RdsSnapshotRestoreTask {
        let config = RdsConfig {
            region: None,
            security_group_ids: security_group_ids.iter().map(|s| s.to_string()).collect(),
            snapshot_wait: quick_wait(5),
            instance_wait: quick_wait(5),
        };
        RdsSnapshotRestoreTask::new(
            TaskContext::new(env("green"), 1),
            env("blue"),
            EnvironmentTx::new(self.store.clone()),
            RdsCopier::new(self.api.clone()),
            self.sleeper.clone(),
            config,
        )
    }

    fn mutating_calls(&self) -> Vec<String> {
        self.api
            .calls()
            .into_iter()
            .filter(|call| !call.starts_with("describe"))
            .collect()
    }
}

#[tokio::test]
async fn restores_copy_and_records_new_physical_database() {
    let h = Harness::new();
    h.api.script_snapshot(&["creating", "available"]);
    h.api
        .script_instance(&["creating", "available", "modifying", "available"]);

    let status = h.task(&[]).process(false).await.unwrap();

    assert_eq!(status, TaskStatus::Done);
    assert_eq!(
        h.mutating_calls(),
        [
            "create_snapshot orders-db-green-snapshot orders-db",
            "copy_parameter_group orders-params orders-params-green",
            "restore orders-db-green orders-db-green-snapshot",
            "modify orders-db-green [sg-live] orders-params-green",
        ]
    );
    assert_eq!(h.sleeper.count(), 6);

    let green = h.store.load(&env("green")).unwrap().unwrap();
    assert!(green.live_physical_database().is_none());
    let physical = green.physical_database("orders").unwrap();
    assert_eq!(physical.instance_name(), "orders-db-green");
    assert!(!physical.is_live());
    assert!(physical.id().is_assigned());
    assert_eq!(
        physical.url(),
        Some("orders-db-green.abc.rds.amazonaws.com:5432")
    );

    let blue = h.store.load(&env("blue")).unwrap().unwrap();
    let (_, live) = blue.live_physical_database().unwrap();
    assert_eq!(live.instance_name(), "orders-db");
}

#[tokio::test]
async fn configured_security_groups_replace_live_ones() {
    let h = Harness::new();
    h.api.script_snapshot(&["available"]);
    h.api.script_instance(&["available", "available"]);

    h.task(&["sg-a", "sg-b"]).process(false).await.unwrap();

    assert!(
        h.mutating_calls()
            .contains(&"modify orders-db-green [sg-a,sg-b] orders-params-green".to_string())
    );
}

#[tokio::test]
async fn failed_snapshot_stops_before_restore() {
    let h = Harness::new();
    h.api.script_snapshot(&["creating", "failed"]);

    let err = h.task(&[]).process(false).await.unwrap_err();

    assert!(
        matches!(err, TaskError::Wait(WaitError::RemoteFailure { .. })),
        "{err:?}"
    );
    assert_eq!(
        h.mutating_calls(),
        ["create_snapshot orders-db-green-snapshot orders-db"]
    );
    assert!(h.store.load(&env("green")).unwrap().is_none());
}

#[tokio::test]
async fn incompatible_parameters_after_modify_fails() {
    let h = Harness::new();
    h.api.script_snapshot(&["available"]);
    h.api
        .script_instance(&["available", "modifying", "incompatible-parameters"]);

    let err = h.task(&[]).process(false).await.unwrap_err();

    assert!(matches!(
        err,
        TaskError::Wait(WaitError::RemoteFailure { .. })
    ));
    assert!(h.store.load(&env("green")).unwrap().is_none());
}

#[tokio::test]
async fn snapshot_never_available_times_out() {
    let h = Harness::new();
    h.api.script_snapshot(&["creating"]);

    let err = h.task(&[]).process(false).await.unwrap_err();

    assert!(matches!(err, TaskError::NotAvailable { ref description, .. }
        if description == "RDS snapshot 'orders-db-green-snapshot'"));
    assert_eq!(h.sleeper.count(), 5);
}

#[tokio::test]
async fn unknown_live_environment_is_a_store_error() {
    let h = Harness::new();
    let mut task = RdsSnapshotRestoreTask::new(
        TaskContext::new(env("green"), 1),
        env("purple"),
        EnvironmentTx::new(h.store.clone()),
        RdsCopier::new(h.api.clone()),
        h.sleeper.clone(),
        RdsConfig::default(),
    );

    let err = task.process(false).await.unwrap_err();

    assert!(matches!(err, TaskError::Store(StoreError::NotFound(_))));
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn live_environment_without_database_fails_precondition() {
    let h = Harness::new();
    h.store.insert(&Environment::new(env("purple")));
    let mut task = RdsSnapshotRestoreTask::new(
        TaskContext::new(env("green"), 1),
        env("purple"),
        EnvironmentTx::new(h.store.clone()),
        RdsCopier::new(h.api.clone()),
        h.sleeper.clone(),
        RdsConfig::default(),
    );

    let err = task.process(false).await.unwrap_err();

    assert!(matches!(err, TaskError::Precondition { .. }), "{err}");
}

#[tokio::test]
async fn live_environment_with_only_staged_database_fails_precondition() {
    let h = Harness::new();
    let mut blue = h.store.load(&env("blue")).unwrap().unwrap();
    blue.set_physical_database("orders", PhysicalDatabase::rds("orders-db", false));
    h.store.insert(&blue);

    let err = h.task(&[]).process(false).await.unwrap_err();

    assert!(matches!(err, TaskError::Precondition { .. }), "{err}");
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn missing_live_instance_is_not_found() {
    let h = Harness::new();
    let mut blue = h.store.load(&env("blue")).unwrap().unwrap();
    blue.set_physical_database("orders", PhysicalDatabase::rds("gone-db", true));
    h.store.insert(&blue);

    let err = h.task(&[]).process(false).await.unwrap_err();

    assert!(matches!(
        err,
        TaskError::Rds(RdsError::InstanceNotFound { ref instance }) if instance == "gone-db"
    ));
}

#[tokio::test]
async fn noop_derives_names_without_calling_rds() {
    let h = Harness::new();

    let status = h.task(&[]).process(true).await.unwrap();

    assert_eq!(status, TaskStatus::Noop);
    assert!(h.api.calls().is_empty());
    assert_eq!(h.store.saves(), 0);
}

#[tokio::test]
async fn dry_run_first_leaves_real_run_result_unchanged() {
    let script = |h: &Harness| {
        h.api.script_snapshot(&["creating", "available"]);
        h.api
            .script_instance(&["creating", "available", "modifying", "available"]);
    };
    let rehearsed = Harness::new();
    let direct = Harness::new();
    script(&rehearsed);
    script(&direct);

    let mut task = rehearsed.task(&[]);
    assert_eq!(task.process(true).await.unwrap(), TaskStatus::Noop);
    assert_eq!(task.process(false).await.unwrap(), TaskStatus::Done);
    assert_eq!(
        direct.task(&[]).process(false).await.unwrap(),
        TaskStatus::Done
    );

    let rehearsed_env = rehearsed.store.load(&env("green")).unwrap().unwrap();
    let direct_env = direct.store.load(&env("green")).unwrap().unwrap();
    assert_eq!(without_ids(&rehearsed_env), without_ids(&direct_env));
    assert_eq!(rehearsed.api.calls(), direct.api.calls());
}
