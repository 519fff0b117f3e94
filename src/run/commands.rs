//! One-shot CLI commands.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::warn;

use super::{EXIT_JOB_FAILED, EXIT_TIMED_OUT};
use crate::app::{
    render_dashboard, render_health, render_outcome, render_page, render_record, render_snapshot,
};
use crate::config::Config;
use crate::models::SubmissionStatus;
use crate::poller::{PollOutcome, ResultPoller};
use crate::service::AnalysisService;
use crate::stats::StatsAggregator;
use crate::store::{search, PageRequest, SubmissionStore};

use super::submit::submit_and_track;

pub(super) async fn submit(
    service: Arc<dyn AnalysisService>,
    config: &Config,
    url: &str,
    user_id: Option<&str>,
) -> Result<ExitCode> {
    let poller = ResultPoller::new(service, config);

    let tracked = tokio::select! {
        tracked = submit_and_track(&poller, url, user_id) => tracked?,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the tracking future cancels its poll session.
            warn!("Interrupted; the analysis continues server-side");
            return Ok(ExitCode::from(130));
        }
    };

    print!("{}", render_outcome(&tracked.outcome));
    Ok(match tracked.outcome {
        PollOutcome::Resolved(_) => ExitCode::SUCCESS,
        PollOutcome::Failed(_) => ExitCode::from(EXIT_JOB_FAILED),
        PollOutcome::TimedOut { .. } => {
            println!("Check again later with: status {}", tracked.job_id);
            ExitCode::from(EXIT_TIMED_OUT)
        }
    })
}

pub(super) async fn status(service: Arc<dyn AnalysisService>, job_id: &str) -> Result<ExitCode> {
    let job_id = job_id.trim();
    anyhow::ensure!(!job_id.is_empty(), "Job id must not be empty");
    let record = service
        .get_submission(job_id)
        .await
        .with_context(|| format!("Failed to fetch submission {job_id}"))?;
    print!("{}", render_record(&record));
    Ok(ExitCode::SUCCESS)
}

pub(super) async fn list(
    service: Arc<dyn AnalysisService>,
    status: Option<SubmissionStatus>,
    page: u32,
    limit: u32,
    term: Option<&str>,
) -> Result<ExitCode> {
    let store = SubmissionStore::new(service);
    let request = PageRequest::new(page, limit);
    let refresh = store.refresh_page(status, request).await;

    if let Some(error) = refresh.error() {
        // A one-shot listing has no previous page to fall back on.
        return Err(error.clone()).context("Failed to list submissions");
    }
    let Some(page) = refresh.page() else {
        anyhow::bail!("No submissions page available");
    };

    let visible = search(page, term.unwrap_or_default());
    print!("{}", render_page(page, &visible, request));
    Ok(ExitCode::SUCCESS)
}

pub(super) async fn stats(service: Arc<dyn AnalysisService>) -> Result<ExitCode> {
    let snapshot = StatsAggregator::new(service)
        .snapshot()
        .await
        .context("Failed to compute statistics")?;
    print!("{}", render_snapshot(&snapshot));
    Ok(ExitCode::SUCCESS)
}

pub(super) async fn dashboard(service: Arc<dyn AnalysisService>) -> Result<ExitCode> {
    let dashboard = StatsAggregator::new(service)
        .dashboard()
        .await
        .context("Failed to load dashboard")?;
    print!("{}", render_dashboard(&dashboard));
    Ok(ExitCode::SUCCESS)
}

pub(super) async fn health(service: Arc<dyn AnalysisService>) -> Result<ExitCode> {
    let report = service
        .health()
        .await
        .context("Failed to reach the analysis service")?;
    print!("{}", render_health(&report));
    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
