//! Submission records and their lifecycle.
//!
//! A [`SubmissionRecord`] describes one analysis job. Its lifecycle is a
//! closed enum, so a record can only carry a result when it is `done` and a
//! processing timestamp when it is `done` or `failed`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

/// Lifecycle state of a submission as reported by the service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// A worker is analysing the URL
    Processing,
    /// Analysis finished with a result
    Done,
    /// Analysis gave up
    Failed,
}

impl SubmissionStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Done => "done",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// `done` and `failed` never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Done | SubmissionStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            SubmissionStatus::Queued => 0,
            SubmissionStatus::Processing => 1,
            SubmissionStatus::Done | SubmissionStatus::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` respects forward-only progression.
    ///
    /// Staying in the same state is allowed; leaving a terminal state is not.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a completed analysis, ordered `Baixo < Medio < Alto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum RiskLevel {
    /// Low risk ("baixo")
    Baixo,
    /// Medium risk ("médio", also reported as "medio")
    Medio,
    /// High risk ("alto")
    Alto,
}

impl RiskLevel {
    /// Canonical (accented) wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Alto => "alto",
            RiskLevel::Medio => "médio",
            RiskLevel::Baixo => "baixo",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a risk level string is not one of the known spellings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level '{0}'")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Accepts both `médio` and `medio`; the service is inconsistent about the
    /// accent and both spellings name the same bucket.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alto" => Ok(RiskLevel::Alto),
            "médio" | "medio" => Ok(RiskLevel::Medio),
            "baixo" => Ok(RiskLevel::Baixo),
            _ => Err(UnknownRiskLevel(s.to_string())),
        }
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One heuristic evaluated by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Heuristic name
    pub name: String,
    /// Whether the URL passed this check
    pub ok: bool,
    /// Explanation shown to the user
    #[serde(default)]
    pub reason: String,
    /// Free-form extra data attached by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Outcome of a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Severity classification; absent when the service did not classify
    pub level: Option<RiskLevel>,
    /// Risk score, 0-100
    pub score: u8,
    /// Heuristics in the order the service evaluated them
    pub checks: Vec<Check>,
    /// Advice for the user, in display order
    pub tips: Vec<String>,
}

/// Where a submission is in its lifecycle, with the data each state owns.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Waiting for a worker
    Queued,
    /// Being analysed
    Processing,
    /// Finished with a result
    Done {
        /// Analysis outcome
        result: AnalysisResult,
        /// When the job reached `done`
        processed_at: DateTime<Utc>,
    },
    /// Gave up
    Failed {
        /// When the job reached `failed`
        processed_at: DateTime<Utc>,
        /// Reason reported by the service, if any
        error_message: Option<String>,
    },
}

impl Lifecycle {
    /// Status corresponding to this lifecycle state.
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Lifecycle::Queued => SubmissionStatus::Queued,
            Lifecycle::Processing => SubmissionStatus::Processing,
            Lifecycle::Done { .. } => SubmissionStatus::Done,
            Lifecycle::Failed { .. } => SubmissionStatus::Failed,
        }
    }
}

/// One analysis job and its lifecycle state.
///
/// Records handed out by the store and poller are snapshots; nothing in the
/// crate mutates a record after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    job_id: String,
    url: String,
    created_at: DateTime<Utc>,
    lifecycle: Lifecycle,
    user_id: Option<String>,
}

impl SubmissionRecord {
    /// Creates a record in the given lifecycle state.
    pub fn new(
        job_id: impl Into<String>,
        url: impl Into<String>,
        created_at: DateTime<Utc>,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            url: url.into(),
            created_at,
            lifecycle,
            user_id: None,
        }
    }

    /// Attaches the submitting user's identifier.
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Identifier assigned by the service.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The submitted URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submission time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Current status.
    pub fn status(&self) -> SubmissionStatus {
        self.lifecycle.status()
    }

    /// Result, present only when the status is `done`.
    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.lifecycle {
            Lifecycle::Done { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Processing time, present only in terminal states.
    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        match &self.lifecycle {
            Lifecycle::Done { processed_at, .. } | Lifecycle::Failed { processed_at, .. } => {
                Some(*processed_at)
            }
            _ => None,
        }
    }

    /// Failure reason reported for a `failed` job.
    pub fn error_message(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Failed { error_message, .. } => error_message.as_deref(),
            _ => None,
        }
    }

    /// Identifier of the submitting user, if the service reported one.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Seconds between submission and terminal state.
    pub fn processing_seconds(&self) -> Option<f64> {
        self.processed_at()
            .map(|processed| (processed - self.created_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Case-insensitive match of `term` against the URL or the job id.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.url.to_lowercase().contains(&needle) || self.job_id.to_lowercase().contains(&needle)
    }
}
