// ABOUTME: Bounded-retry polling loop that drives a ProgressChecker to done or timeout.
// ABOUTME: Fixed delay between probes; the sleeper is the only suspension point.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::checker::{ProgressChecker, WaitError};
use super::sleeper::Sleeper;

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_max_num_waits")]
    pub max_num_waits: u32,

    /// Log a progress line every Nth wait (0 disables progress lines).
    #[serde(default = "default_report_interval")]
    pub report_interval: u32,

    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,
}

fn default_max_num_waits() -> u32 {
    120
}

fn default_report_interval() -> u32 {
    4
}

fn default_delay() -> Duration {
    Duration::from_secs(30)
}

impl Default for WaitConfig {
    /// 120 waits of 30 seconds (one hour), reporting every 2 minutes.
    fn default() -> Self {
        WaitConfig {
            max_num_waits: default_max_num_waits(),
            report_interval: default_report_interval(),
            delay: default_delay(),
        }
    }
}

impl WaitConfig {
    /// Worst-case time spent sleeping before giving up.
    pub fn budget(&self) -> Duration {
        self.delay * self.max_num_waits
    }

    /// Whether wait `wait_number` (1-based) logs a progress line.
    pub fn reports_at(&self, wait_number: u32) -> bool {
        self.report_interval > 0 && wait_number % self.report_interval == 0
    }
}

/// Result of a wait that did not fail.
///
/// Timing out is not an error at this layer: the caller decides whether an
/// operation that never finished is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a timed out wait must be handled"]
pub enum WaitOutcome<T> {
    Done(T),
    TimedOut { waits: u32 },
}

impl<T> WaitOutcome<T> {
    pub fn into_done(self) -> Option<T> {
        match self {
            WaitOutcome::Done(value) => Some(value),
            WaitOutcome::TimedOut { .. } => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut { .. })
    }
}

/// Polls a started operation until its checker reports done, fails, or the budget runs out.
pub struct Waiter<C> {
    config: WaitConfig,
    sleeper: Arc<dyn Sleeper>,
    checker: C,
}

impl<C: ProgressChecker> Waiter<C> {
    pub fn new(config: WaitConfig, sleeper: Arc<dyn Sleeper>, checker: C) -> Self {
        Self {
            config,
            sleeper,
            checker,
        }
    }

    /// Sleep, probe, repeat.
    ///
    /// A failing probe is returned immediately. After `max_num_waits` probes
    /// without success the checker's `timeout` is called once and
    /// [`WaitOutcome::TimedOut`] is returned.
    pub async fn wait_until_done(mut self) -> Result<WaitOutcome<C::Output>, WaitError> {
        let description = self.checker.description();
        let max_num_waits = self.config.max_num_waits;

        for wait_number in 1..=max_num_waits {
            self.sleeper.sleep(self.config.delay).await;
            self.checker.followup_check(wait_number).await?;

            if self.checker.is_done() {
                tracing::debug!(wait_number, "{} done", description);
                return match self.checker.take_result() {
                    Some(result) => Ok(WaitOutcome::Done(result)),
                    None => Err(WaitError::MissingResult { description }),
                };
            }

            if self.config.reports_at(wait_number) {
                let waited = self.config.delay * wait_number;
                tracing::info!(
                    wait_number,
                    max_num_waits,
                    "Waiting for {} ({}s so far)",
                    description,
                    waited.as_secs()
                );
            }
        }

        self.checker.timeout();
        Ok(WaitOutcome::TimedOut {
            waits: max_num_waits,
        })
    }
}
