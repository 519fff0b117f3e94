//! Bounded polling of a submitted job until it reaches a terminal state.
//!
//! [`ResultPoller::start`] spawns a driver task per job. The driver checks the
//! job's status, sleeps a fixed interval while it is `queued`/`processing`, and
//! delivers exactly one of three outcomes:
//! - `on_resolved` when the job reaches `done`
//! - `on_failed` when the job reaches `failed` or a status check errors
//! - `on_timeout` when the attempt bound is exhausted
//!
//! Cancelling a session suppresses all of them. Attempts within a session are
//! strictly sequential; separate sessions are independent.

mod scheduler;
mod session;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;

pub use scheduler::{Scheduler, TokioScheduler};
pub use session::{PollCallbacks, PollFailure, PollOutcome, PollSession, PollState};

use crate::config::Config;
use crate::error_handling::TrackerError;
use crate::models::SubmissionStatus;
use crate::service::AnalysisService;

/// Starts and drives poll sessions against an [`AnalysisService`].
#[derive(Clone)]
pub struct ResultPoller {
    service: Arc<dyn AnalysisService>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    max_attempts: u32,
}

impl ResultPoller {
    /// Creates a poller using the configured interval and attempt bound.
    pub fn new(service: Arc<dyn AnalysisService>, config: &Config) -> Self {
        Self {
            service,
            scheduler: Arc::new(TokioScheduler),
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts.max(1),
        }
    }

    /// Replaces the timer used between attempts.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Overrides the interval and attempt bound (at least one attempt is made).
    pub fn with_limits(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.interval = interval;
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Service the poller checks job status against.
    pub fn service(&self) -> &Arc<dyn AnalysisService> {
        &self.service
    }

    /// Begins polling `job_id` immediately, with no initial delay.
    ///
    /// Must be called from within a tokio runtime; the session is driven by a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::EmptyJobId` if `job_id` is empty or blank.
    pub fn start(
        &self,
        job_id: &str,
        callbacks: PollCallbacks,
    ) -> Result<PollSession, TrackerError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(TrackerError::EmptyJobId);
        }

        let session = PollSession::new(job_id.to_string(), self.max_attempts, self.interval);
        debug!(
            "Polling job {} every {:?}, at most {} attempts",
            job_id, self.interval, self.max_attempts
        );
        tokio::spawn(drive(
            Arc::clone(&self.service),
            Arc::clone(&self.scheduler),
            session.clone(),
            callbacks,
        ));
        Ok(session)
    }

    /// Polls `job_id` to a terminal outcome.
    ///
    /// Dropping the returned future cancels the session, so wrapping it in
    /// `tokio::select!` with a shutdown signal is enough to stop tracking.
    ///
    /// # Errors
    ///
    /// - `TrackerError::EmptyJobId` for an empty job id
    /// - `TrackerError::Cancelled` if the session ended without an outcome
    pub async fn poll(&self, job_id: &str) -> Result<PollOutcome, TrackerError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (resolved_tx, failed_tx, timeout_tx) = (tx.clone(), tx.clone(), tx);
        let timeout_job = job_id.trim().to_string();
        let attempts = self.max_attempts;

        let callbacks = PollCallbacks::new(
            move |record| {
                let _ = resolved_tx.send(PollOutcome::Resolved(record));
            },
            move |failure| {
                let _ = failed_tx.send(PollOutcome::Failed(failure));
            },
            move || {
                let _ = timeout_tx.send(PollOutcome::TimedOut {
                    job_id: timeout_job,
                    attempts,
                });
            },
        );

        let session = self.start(job_id, callbacks)?;
        let _guard = CancelOnDrop(session.clone());

        // Every sender lives in the callbacks, so `None` means the driver
        // dropped them without delivering.
        rx.recv()
            .await
            .ok_or_else(|| TrackerError::Cancelled(session.job_id().to_string()))
    }
}

impl std::fmt::Debug for ResultPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPoller")
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

struct CancelOnDrop(PollSession);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

struct CloseOnDrop(PollSession);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.mark_closed();
    }
}

async fn drive(
    service: Arc<dyn AnalysisService>,
    scheduler: Arc<dyn Scheduler>,
    session: PollSession,
    callbacks: PollCallbacks,
) {
    let _closed = CloseOnDrop(session.clone());
    let job_id = session.job_id().to_string();
    let mut last_status: Option<SubmissionStatus> = None;

    loop {
        if session.state().is_finished() {
            return;
        }

        let fetched = service.get_submission(&job_id).await;

        // A cancel issued while the request was in flight wins over its response.
        if session.state().is_finished() {
            debug!("Discarding status of job {job_id}: session already {:?}", session.state());
            return;
        }
        let attempt = session.record_attempt();

        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                warn!("Status check {attempt} for job {job_id} failed ({}): {e}", e.kind());
                if session.finish(PollState::Failed) {
                    callbacks.fail(PollFailure::PollError(e));
                }
                return;
            }
        };

        let status = record.status();
        if let Some(previous) = last_status {
            if !previous.can_transition_to(status) {
                warn!("Job {job_id} went from {previous} back to {status}");
            }
        }
        last_status = Some(status);

        match status {
            SubmissionStatus::Done => {
                if session.finish(PollState::Resolved) {
                    info!("Job {job_id} done after {attempt} status checks");
                    callbacks.resolve(record);
                }
                return;
            }
            SubmissionStatus::Failed => {
                if session.finish(PollState::Failed) {
                    info!("Job {job_id} failed after {attempt} status checks");
                    callbacks.fail(PollFailure::JobFailed(record));
                }
                return;
            }
            SubmissionStatus::Queued | SubmissionStatus::Processing => {
                if attempt >= session.max_attempts() {
                    if session.finish(PollState::TimedOut) {
                        warn!("Job {job_id} still {status} after {attempt} status checks; giving up");
                        callbacks.time_out();
                    }
                    return;
                }
                debug!(
                    "Job {job_id} is {status} (attempt {attempt}/{})",
                    session.max_attempts()
                );
                tokio::select! {
                    _ = scheduler.sleep(session.interval()) => {}
                    _ = session.cancellation().cancelled() => return,
                }
            }
        }
    }
}
