//! Submitting URLs and tracking them to completion.

use log::info;

use crate::app::validate_submission_url;
use crate::error_handling::TrackerError;
use crate::poller::{PollOutcome, ResultPoller};
use crate::service::{AnalysisService, SubmitReceipt, SubmitRequest};

/// A submission that was accepted and tracked to a terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSubmission {
    /// Identifier assigned by the service
    pub job_id: String,
    /// How tracking ended
    pub outcome: PollOutcome,
}

/// Validates `url` and enqueues it for analysis.
///
/// # Arguments
///
/// * `service` - The analysis service to submit to
/// * `url` - URL as typed by the user; must start with `http://` or `https://`
/// * `user_id` - Optional opaque identifier of the submitting user
///
/// # Errors
///
/// - `TrackerError::InvalidUrl` if the URL is rejected locally
/// - `TrackerError::Service` if the service refuses the submission or cannot be reached
pub async fn submit(
    service: &dyn AnalysisService,
    url: &str,
    user_id: Option<&str>,
) -> Result<SubmitReceipt, TrackerError> {
    let url = validate_submission_url(url)?;
    let request = SubmitRequest {
        url,
        user_id: user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    };

    let receipt = service.submit(&request).await?;
    info!("Submitted {} as job {}", request.url, receipt.job_id);
    Ok(receipt)
}

/// Submits `url` and polls the resulting job to a terminal outcome.
///
/// A job that fails or times out is still `Ok`; inspect
/// [`TrackedSubmission::outcome`].
///
/// # Errors
///
/// Anything [`submit`] returns, plus `TrackerError::Cancelled` if the poll
/// session is cancelled.
pub async fn submit_and_track(
    poller: &ResultPoller,
    url: &str,
    user_id: Option<&str>,
) -> Result<TrackedSubmission, TrackerError> {
    let receipt = submit(poller.service().as_ref(), url, user_id).await?;
    let outcome = poller.poll(&receipt.job_id).await?;
    Ok(TrackedSubmission {
        job_id: receipt.job_id,
        outcome,
    })
}
