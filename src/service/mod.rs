//! Client for the remote URL-analysis service.
//!
//! The service contract is expressed as the [`AnalysisService`] trait so the
//! poller, store and aggregator can be driven by the real HTTP client or by a
//! scripted stand-in. Response shape differences are resolved inside this
//! module; callers only ever see normalized types.

mod http;
mod types;
mod wire;

use async_trait::async_trait;

pub use http::HttpAnalysisService;
pub use types::{HealthReport, ListQuery, SubmissionPage, SubmitReceipt, SubmitRequest};

use crate::error_handling::ServiceClientError;
use crate::models::{ServiceStats, SubmissionRecord};

/// Operations the remote analysis service exposes.
///
/// Every call performs exactly one request; retries and scheduling belong to
/// the caller.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// `POST /submit`: enqueues `request.url` for analysis.
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, ServiceClientError>;

    /// `GET /submission/{job_id}`: current record of one job.
    async fn get_submission(&self, job_id: &str) -> Result<SubmissionRecord, ServiceClientError>;

    /// `GET /submissions`: one page, newest first.
    async fn list_submissions(&self, query: &ListQuery)
        -> Result<SubmissionPage, ServiceClientError>;

    /// `GET /stats`: pre-aggregated statistics.
    ///
    /// `Ok(None)` means the service did not provide them and the caller should
    /// derive them locally.
    async fn get_stats(&self) -> Result<Option<ServiceStats>, ServiceClientError>;

    /// `GET /health`.
    async fn health(&self) -> Result<HealthReport, ServiceClientError>;
}
