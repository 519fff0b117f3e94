//! Periodic background refresh tied to a handle's lifetime.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Keeps a periodic refresh alive.
///
/// The refresh stops when [`AutoRefreshHandle::stop`] is called or the handle
/// is dropped, whichever comes first.
#[derive(Debug)]
pub struct AutoRefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutoRefreshHandle {
    /// Stops the refresh; a refresh in progress is abandoned.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the refresh is still scheduled.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops the refresh and waits for its task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs `tick` now and then every `every` until the returned handle stops.
///
/// Ticks never overlap: a tick that runs long delays the next one, and missed
/// ticks are skipped rather than queued.
pub(crate) fn spawn_periodic<F, Fut>(every: Duration, mut tick: F) -> AutoRefreshHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick() => {}
            }
        }
        log::debug!("Auto-refresh every {every:?} stopped");
    });

    AutoRefreshHandle {
        cancel,
        task: Some(task),
    }
}
