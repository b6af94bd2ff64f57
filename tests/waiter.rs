// ABOUTME: Integration tests for the bounded polling loop.
// ABOUTME: Verifies probe counts, timeout handling and early failure against a scripted checker.

mod support;

use async_trait::async_trait;
use bluegreen::wait::{ProgressChecker, WaitError, WaitOutcome, Waiter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use support::{RecordingSleeper, quick_wait};

#[derive(Default)]
struct Counters {
    probes: AtomicU32,
    timeouts: AtomicU32,
}

/// Finishes on probe `done_at`, fails on probe `fail_at`; never does either when `None`.
struct ScriptedChecker {
    counters: Arc<Counters>,
    done_at: Option<u32>,
    fail_at: Option<u32>,
    result: Option<u32>,
    done: bool,
}

impl ScriptedChecker {
    fn new(counters: Arc<Counters>, done_at: Option<u32>, fail_at: Option<u32>) -> Self {
        Self {
            counters,
            done_at,
            fail_at,
            result: None,
            done: false,
        }
    }
}

#[async_trait]
impl ProgressChecker for ScriptedChecker {
    type Output = u32;

    fn description(&self) -> String {
        "scripted operation".to_string()
    }

    fn initial_check(&mut self) -> Result<(), WaitError> {
        Ok(())
    }

    async fn followup_check(&mut self, wait_number: u32) -> Result<(), WaitError> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(wait_number) {
            return Err(WaitError::RemoteFailure {
                context: String::new(),
                detail: format!("failed on wait {wait_number}"),
            });
        }
        if self.done_at == Some(wait_number) {
            self.done = true;
            self.result = Some(wait_number);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<u32> {
        self.result.take()
    }

    fn timeout(&mut self) {
        self.counters.timeouts.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn never_done_probes_budget_then_times_out_once() {
    support::init_tracing();
    let counters = Arc::new(Counters::default());
    let sleeper = RecordingSleeper::new();
    let checker = ScriptedChecker::new(counters.clone(), None, None);

    let outcome = Waiter::new(quick_wait(5), sleeper.clone(), checker)
        .wait_until_done()
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut { waits: 5 });
    assert_eq!(counters.probes.load(Ordering::SeqCst), 5);
    assert_eq!(counters.timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.count(), 5);
    assert_eq!(sleeper.total(), Duration::from_secs(150));
}

#[tokio::test]
async fn failure_stops_polling_without_timeout() {
    let counters = Arc::new(Counters::default());
    let checker = ScriptedChecker::new(counters.clone(), None, Some(3));

    let err = Waiter::new(quick_wait(10), RecordingSleeper::new(), checker)
        .wait_until_done()
        .await
        .unwrap_err();

    assert!(matches!(err, WaitError::RemoteFailure { .. }));
    assert_eq!(counters.probes.load(Ordering::SeqCst), 3);
    assert_eq!(counters.timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn done_returns_result_from_that_probe() {
    let counters = Arc::new(Counters::default());
    let checker = ScriptedChecker::new(counters.clone(), Some(4), None);

    let outcome = Waiter::new(quick_wait(10), RecordingSleeper::new(), checker)
        .wait_until_done()
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::Done(4));
    assert_eq!(counters.probes.load(Ordering::SeqCst), 4);
    assert_eq!(counters.timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn done_on_last_allowed_probe_is_not_a_timeout() {
    let counters = Arc::new(Counters::default());
    let checker = ScriptedChecker::new(counters.clone(), Some(3), None);

    let outcome = Waiter::new(quick_wait(3), RecordingSleeper::new(), checker)
        .wait_until_done()
        .await
        .unwrap();

    assert_eq!(outcome.into_done(), Some(3));
    assert_eq!(counters.timeouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_budget_times_out_without_probing() {
    let counters = Arc::new(Counters::default());
    let sleeper = RecordingSleeper::new();
    let checker = ScriptedChecker::new(counters.clone(), Some(1), None);

    let outcome = Waiter::new(quick_wait(0), sleeper.clone(), checker)
        .wait_until_done()
        .await
        .unwrap();

    assert!(outcome.is_timed_out());
    assert_eq!(counters.probes.load(Ordering::SeqCst), 0);
    assert_eq!(counters.timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.count(), 0);
}
