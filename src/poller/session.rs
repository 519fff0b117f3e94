//! Poll session state and the callbacks a session delivers to.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error_handling::{ErrorKind, ServiceClientError};
use crate::models::SubmissionRecord;

/// State of a poll session.
///
/// A session starts in `Polling` and moves exactly once to one of the other
/// states; nothing leaves a finished state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Attempts are still being made
    Polling,
    /// The job reached `done`
    Resolved,
    /// The job reached `failed`, or a status check errored
    Failed,
    /// The attempt bound was exhausted
    TimedOut,
    /// The caller cancelled the session
    Cancelled,
}

impl PollState {
    /// Whether the session has stopped.
    pub fn is_finished(&self) -> bool {
        !matches!(self, PollState::Polling)
    }
}

/// Why a session ended in [`PollState::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollFailure {
    /// The service reported the job as `failed`.
    JobFailed(SubmissionRecord),
    /// The status check itself errored; polling stopped instead of retrying.
    PollError(ServiceClientError),
}

impl PollFailure {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            PollFailure::JobFailed(record) => match record.error_message() {
                Some(reason) => format!(
                    "The analysis of {} failed: {reason}. Please submit the URL again.",
                    record.url()
                ),
                None => format!(
                    "The analysis of {} failed. Please submit the URL again.",
                    record.url()
                ),
            },
            PollFailure::PollError(error) => error.kind().user_message().to_string(),
        }
    }
}

/// Terminal outcome of a session, as returned by the awaitable poll API.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job finished with a result.
    Resolved(SubmissionRecord),
    /// The job failed or could not be checked.
    Failed(PollFailure),
    /// The job did not reach a terminal state in time.
    TimedOut {
        /// Job that was being tracked
        job_id: String,
        /// Status checks performed
        attempts: u32,
    },
}

impl PollOutcome {
    /// Message suitable for showing to the user.
    ///
    /// Failure and timeout messages never coincide: a failed job should be
    /// resubmitted, a timed-out one may still complete server-side.
    pub fn user_message(&self) -> String {
        match self {
            PollOutcome::Resolved(record) => format!("Analysis of {} complete.", record.url()),
            PollOutcome::Failed(failure) => failure.user_message(),
            PollOutcome::TimedOut { .. } => ErrorKind::Timeout.user_message().to_string(),
        }
    }
}

type ResolvedFn = Box<dyn FnOnce(SubmissionRecord) + Send>;
type FailedFn = Box<dyn FnOnce(PollFailure) + Send>;
type TimeoutFn = Box<dyn FnOnce() + Send>;

/// The three terminal callbacks of a session.
///
/// Each callback is `FnOnce` and delivering one consumes the set, so at most
/// one of them can ever run.
pub struct PollCallbacks {
    on_resolved: ResolvedFn,
    on_failed: FailedFn,
    on_timeout: TimeoutFn,
}

impl PollCallbacks {
    /// Bundles the callbacks for [`crate::ResultPoller::start`].
    pub fn new(
        on_resolved: impl FnOnce(SubmissionRecord) + Send + 'static,
        on_failed: impl FnOnce(PollFailure) + Send + 'static,
        on_timeout: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            on_resolved: Box::new(on_resolved),
            on_failed: Box::new(on_failed),
            on_timeout: Box::new(on_timeout),
        }
    }

    pub(crate) fn resolve(self, record: SubmissionRecord) {
        (self.on_resolved)(record)
    }

    pub(crate) fn fail(self, failure: PollFailure) {
        (self.on_failed)(failure)
    }

    pub(crate) fn time_out(self) {
        (self.on_timeout)()
    }
}

impl std::fmt::Debug for PollCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCallbacks").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct SessionInner {
    job_id: String,
    attempt: AtomicU32,
    max_attempts: u32,
    interval: Duration,
    state: watch::Sender<PollState>,
    cancel: CancellationToken,
    closed: CancellationToken,
}

/// Handle to one job being polled.
///
/// Clones share the same session. Dropping every handle does not stop the
/// session; call [`PollSession::cancel`] for that.
#[derive(Debug, Clone)]
pub struct PollSession {
    inner: Arc<SessionInner>,
}

impl PollSession {
    pub(crate) fn new(job_id: String, max_attempts: u32, interval: Duration) -> Self {
        let (state, _) = watch::channel(PollState::Polling);
        Self {
            inner: Arc::new(SessionInner {
                job_id,
                attempt: AtomicU32::new(0),
                max_attempts,
                interval,
                state,
                cancel: CancellationToken::new(),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Job being tracked.
    pub fn job_id(&self) -> &str {
        &self.inner.job_id
    }

    /// Status checks answered so far.
    pub fn attempt(&self) -> u32 {
        self.inner.attempt.load(Ordering::SeqCst)
    }

    /// Attempt bound of this session.
    pub fn max_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Fixed delay between attempts.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Current state.
    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    /// Whether the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == PollState::Cancelled
    }

    /// Receiver notified on the (single) state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    /// Cancels the session.
    ///
    /// The next scheduled attempt is suppressed and a response already in
    /// flight is discarded; no callback fires afterwards. Returns `false` if
    /// the session had already finished, which makes repeated calls harmless.
    pub fn cancel(&self) -> bool {
        let cancelled = self.finish(PollState::Cancelled);
        if cancelled {
            self.inner.cancel.cancel();
        }
        cancelled
    }

    /// Completes once the driving task has stopped making requests.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    /// Moves `Polling` to `next`; returns whether this call made the change.
    pub(crate) fn finish(&self, next: PollState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == PollState::Polling {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn record_attempt(&self) -> u32 {
        self.inner.attempt.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.closed.cancel();
    }
}
