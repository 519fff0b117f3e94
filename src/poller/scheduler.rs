//! Timer abstraction used between poll attempts.

use std::time::Duration;

use async_trait::async_trait;

/// Source of the inter-attempt delay.
///
/// Production code sleeps on the tokio timer; tests substitute a scheduler
/// that records the requested delays and returns immediately.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Completes after `duration` has elapsed.
    async fn sleep(&self, duration: Duration);
}

/// [`Scheduler`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
