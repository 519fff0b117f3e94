//! `reqwest`-backed implementation of [`AnalysisService`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::StatusCode;
use url::Url;

use super::types::{HealthReport, ListQuery, SubmissionPage, SubmitReceipt, SubmitRequest};
use super::wire;
use super::AnalysisService;
use crate::error_handling::{categorize_reqwest_error, service_error_from_body, ServiceClientError};
use crate::models::{ServiceStats, SubmissionRecord};

/// Talks to the analysis service over HTTP.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: Arc<reqwest::Client>,
    base_url: Url,
}

impl HttpAnalysisService {
    /// Creates a service client rooted at `base_url`.
    ///
    /// A base URL with a path prefix (`http://host/api/`) is honoured; endpoint
    /// paths are appended to it.
    pub fn new(client: Arc<reqwest::Client>, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ServiceClientError::Transport(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and returns the body of a 2xx response.
    ///
    /// Non-success statuses become `ServiceClientError::Service` with the
    /// service's `detail` message.
    async fn fetch_body(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), ServiceClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        if status.is_success() {
            Ok((status, body))
        } else {
            Err(service_error_from_body(status, &body))
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, ServiceClientError> {
        let url = self.endpoint(&["submit"])?;
        debug!("POST {url} for {}", request.url);
        let (_, body) = self.fetch_body(self.client.post(url).json(request)).await?;
        wire::parse_receipt(&body)
    }

    async fn get_submission(&self, job_id: &str) -> Result<SubmissionRecord, ServiceClientError> {
        let url = self.endpoint(&["submission", job_id])?;
        debug!("GET {url}");
        let (_, body) = self.fetch_body(self.client.get(url)).await?;
        wire::parse_submission(&body, job_id, Utc::now())
    }

    async fn list_submissions(
        &self,
        query: &ListQuery,
    ) -> Result<SubmissionPage, ServiceClientError> {
        let mut url = self.endpoint(&["submissions"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("limit", &query.limit.to_string())
                .append_pair("offset", &query.offset.to_string());
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
        }
        debug!("GET {url}");
        let (_, body) = self.fetch_body(self.client.get(url)).await?;
        wire::parse_listing(&body, Utc::now())
    }

    async fn get_stats(&self) -> Result<Option<ServiceStats>, ServiceClientError> {
        let url = self.endpoint(&["stats"])?;
        debug!("GET {url}");
        match self.fetch_body(self.client.get(url)).await {
            Ok((StatusCode::NO_CONTENT, _)) => Ok(None),
            Ok((_, body)) => wire::parse_stats(&body),
            // Deployments without the aggregate endpoint
            Err(ServiceClientError::Service { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn health(&self) -> Result<HealthReport, ServiceClientError> {
        let url = self.endpoint(&["health"])?;
        let (_, body) = self.fetch_body(self.client.get(url)).await?;
        serde_json::from_str(&body)
            .map_err(|e| ServiceClientError::DataShape(format!("health response is malformed: {e}")))
    }
}
