// ABOUTME: The single time-delay primitive used by wait loops.
// ABOUTME: Substituted in tests so waits run without real delays.

use async_trait::async_trait;
use std::time::Duration;

/// Pause execution for a while.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
