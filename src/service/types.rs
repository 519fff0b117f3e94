//! Request and response types for the analysis service contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{SubmissionRecord, SubmissionStatus};

/// Body of `POST /submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRequest {
    /// URL to analyse
    pub url: String,
    /// Opaque identifier of the submitting user
    pub user_id: Option<String>,
}

/// Acknowledgement returned by `POST /submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Identifier to poll with
    pub job_id: String,
}

/// Parameters of `GET /submissions`.
///
/// Also the cache key of the submission store, so two views asking for the
/// same page share one cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListQuery {
    /// Server-side status filter
    pub status: Option<SubmissionStatus>,
    /// Page size
    pub limit: u32,
    /// Records to skip
    pub offset: u32,
}

/// One page of submissions, normalized from either listing shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPage {
    /// Records in the order the service returned them (newest first)
    pub records: Vec<SubmissionRecord>,
    /// Total number of submissions matching the query
    pub total: u64,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthReport {
    /// Overall status (`ok` when healthy)
    pub status: String,
    /// Server time of the check
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Per-dependency status as reported by the service
    #[serde(default)]
    pub services: BTreeMap<String, serde_json::Value>,
}

impl HealthReport {
    /// Whether the service reports itself healthy.
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
