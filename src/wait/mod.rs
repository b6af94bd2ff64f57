// ABOUTME: Generic polling engine for long-running external operations.
// ABOUTME: Separates what to check (ProgressChecker) from how long and how often (Waiter).

mod checker;
pub mod lines;
mod sleeper;
mod waiter;

pub use checker::{BoxError, ProgressChecker, WaitError};
pub use sleeper::{Sleeper, TokioSleeper};
pub use waiter::{WaitConfig, WaitOutcome, Waiter};
