// ABOUTME: ProgressChecker contract for one kind of asynchronous external operation.
// ABOUTME: Also defines the errors a checker can raise while starting or polling.

use async_trait::async_trait;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Recognizes start, success, failure and timeout of one asynchronous operation.
///
/// The checker is seeded with the kickoff output when it is constructed.
/// [`initial_check`](ProgressChecker::initial_check) must succeed before a
/// [`Waiter`](super::Waiter) is built around it.
#[async_trait]
pub trait ProgressChecker: Send {
    /// Value produced by the operation once it succeeds.
    type Output: Send;

    /// Human-readable identifier of the watched operation.
    ///
    /// Must not depend on anything learned by `initial_check`.
    fn description(&self) -> String;

    /// Extract what is needed to watch progress from the kickoff output.
    ///
    /// Failing here is fatal: there is nothing to poll.
    fn initial_check(&mut self) -> Result<(), WaitError>;

    /// One polling probe.
    ///
    /// Raises on a failure signature. Records completion on a success signature.
    /// Otherwise leaves the checker not done.
    async fn followup_check(&mut self, wait_number: u32) -> Result<(), WaitError>;

    fn is_done(&self) -> bool;

    /// The produced value; `Some` only once done. Taking it leaves `None` behind.
    fn take_result(&mut self) -> Option<Self::Output>;

    /// Called once when the wait budget runs out. Logs; never fails.
    fn timeout(&mut self);
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("blank initial output from {description}")]
    BlankInitialOutput { description: String },

    #[error("{context}could not find result value '{capture}' in initial output")]
    MissingCapture {
        context: String,
        capture: &'static str,
    },

    #[error("{context}FAILED: {detail}")]
    RemoteFailure { context: String, detail: String },

    #[error("{context}probe failed: {source}")]
    Probe {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("{description} reported done without a result")]
    MissingResult { description: String },
}

impl WaitError {
    pub fn probe(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WaitError::Probe {
            context: context.into(),
            source: source.into(),
        }
    }
}
