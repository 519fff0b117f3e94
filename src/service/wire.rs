//! Normalization of service responses.
//!
//! Every response shape variant is resolved here, on receipt, into the typed
//! values the rest of the crate uses:
//! - listings arrive as `{submissions, total}` or as a bare array
//! - statistics arrive nested (`byStatus`/`byRisk`/`byHour`) or flat
//!   (`queued`, `alto`, `medio`, ...), or as `null`
//! - risk levels arrive as `médio` or `medio`

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use crate::error_handling::ServiceClientError;
use crate::models::{
    AnalysisResult, Check, Lifecycle, RiskLevel, ServiceStats, SubmissionRecord,
    SubmissionStatus,
};
use crate::service::types::{SubmissionPage, SubmitReceipt};

/// A submission exactly as the service serializes it.
#[derive(Debug, Deserialize)]
struct WireSubmission {
    #[serde(default)]
    job_id: Option<String>,
    url: String,
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    processed_at: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    user_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    checks: Vec<Check>,
    #[serde(default)]
    tips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireReceipt {
    #[serde(default)]
    job_id: Option<String>,
}

fn shape_error(message: impl Into<String>) -> ServiceClientError {
    ServiceClientError::DataShape(message.into())
}

fn parse_json(body: &str) -> Result<Value, ServiceClientError> {
    serde_json::from_str(body).map_err(|e| shape_error(format!("invalid JSON: {e}")))
}

/// Parses a service timestamp.
///
/// Offsets are honoured; timestamps without one are read as local time, which
/// is how the service's naive `created_at` values are meant.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

impl WireResult {
    fn into_result(self, job_id: &str) -> Result<AnalysisResult, ServiceClientError> {
        let score = self
            .score
            .ok_or_else(|| shape_error(format!("result of job {job_id} has no score")))?;
        if !(0.0..=100.0).contains(&score) {
            return Err(shape_error(format!(
                "result of job {job_id} has score {score} outside 0-100"
            )));
        }

        // An absent level leaves the result unclassified; an unrecognized one is rejected.
        let level = self
            .level
            .as_deref()
            .map(|raw| {
                raw.parse::<RiskLevel>().map_err(|_| {
                    shape_error(format!("result of job {job_id} has unknown level '{raw}'"))
                })
            })
            .transpose()?;

        Ok(AnalysisResult {
            level,
            score: score.round() as u8,
            checks: self.checks,
            tips: self.tips,
        })
    }
}

impl WireSubmission {
    fn into_record(
        self,
        fallback_job_id: Option<&str>,
        observed_at: DateTime<Utc>,
    ) -> Result<SubmissionRecord, ServiceClientError> {
        let job_id = self
            .job_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| fallback_job_id.map(str::to_string))
            .ok_or_else(|| shape_error(format!("submission for {} has no job_id", self.url)))?;

        let status: SubmissionStatus = self.status.parse().map_err(|_| {
            shape_error(format!("job {job_id} has unknown status '{}'", self.status))
        })?;

        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| shape_error(format!("job {job_id} has no usable created_at")))?;

        let processed_at = self.processed_at.as_deref().and_then(parse_timestamp);

        let lifecycle = match status {
            SubmissionStatus::Queued | SubmissionStatus::Processing => {
                if self.result.as_ref().is_some_and(|r| !r.is_null()) || processed_at.is_some() {
                    debug!("Job {job_id} is {status} but carries terminal fields; ignoring them");
                }
                if status == SubmissionStatus::Queued {
                    Lifecycle::Queued
                } else {
                    Lifecycle::Processing
                }
            }
            SubmissionStatus::Done => {
                let raw = self
                    .result
                    .filter(|r| !r.is_null())
                    .ok_or_else(|| shape_error(format!("job {job_id} is done without a result")))?;
                let result = decode_result(raw, &job_id)?.into_result(&job_id)?;
                Lifecycle::Done {
                    result,
                    processed_at: processed_at.unwrap_or_else(|| {
                        debug!("Job {job_id} is done without processed_at; using observation time");
                        observed_at
                    }),
                }
            }
            SubmissionStatus::Failed => Lifecycle::Failed {
                processed_at: processed_at.unwrap_or_else(|| {
                    debug!("Job {job_id} failed without processed_at; using observation time");
                    observed_at
                }),
                error_message: self.error_message.filter(|m| !m.trim().is_empty()),
            },
        };

        let user_id = match self.user_id {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        Ok(SubmissionRecord::new(job_id, self.url, created_at, lifecycle).with_user_id(user_id))
    }
}

/// The result column is JSON; some deployments hand it back as a JSON string.
fn decode_result(raw: Value, job_id: &str) -> Result<WireResult, ServiceClientError> {
    let value = match raw {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| shape_error(format!("result of job {job_id} is not JSON: {e}")))?,
        other => other,
    };
    serde_json::from_value(value)
        .map_err(|e| shape_error(format!("result of job {job_id} is malformed: {e}")))
}

/// Parses the body of `GET /submission/{job_id}`.
///
/// The endpoint may omit `job_id`; the requested identifier fills it in.
pub(crate) fn parse_submission(
    body: &str,
    requested_job_id: &str,
    observed_at: DateTime<Utc>,
) -> Result<SubmissionRecord, ServiceClientError> {
    let wire: WireSubmission = serde_json::from_str(body)
        .map_err(|e| shape_error(format!("submission {requested_job_id} is malformed: {e}")))?;
    wire.into_record(Some(requested_job_id), observed_at)
}

/// Parses the body of `GET /submissions` in either shape.
///
/// Individual records that cannot be read are skipped with a warning so one
/// bad row does not blank the whole list.
pub(crate) fn parse_listing(
    body: &str,
    observed_at: DateTime<Utc>,
) -> Result<SubmissionPage, ServiceClientError> {
    let (items, reported_total) = match parse_json(body)? {
        Value::Array(items) => (items, None),
        Value::Object(mut object) => match object.remove("submissions") {
            Some(Value::Array(items)) => {
                let total = object.get("total").and_then(count_value);
                (items, total)
            }
            Some(Value::Null) | None => (Vec::new(), object.get("total").and_then(count_value)),
            Some(_) => return Err(shape_error("'submissions' is not an array")),
        },
        Value::Null => (Vec::new(), None),
        _ => return Err(shape_error("listing is neither an array nor an object")),
    };

    let received = items.len() as u64;
    let records = items
        .into_iter()
        .filter_map(|item| {
            match serde_json::from_value::<WireSubmission>(item)
                .map_err(|e| shape_error(e.to_string()))
                .and_then(|wire| wire.into_record(None, observed_at))
            {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable submission in listing: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(SubmissionPage {
        records,
        total: reported_total.unwrap_or(received),
    })
}

/// Parses the body of `POST /submit`.
pub(crate) fn parse_receipt(body: &str) -> Result<SubmitReceipt, ServiceClientError> {
    let wire: WireReceipt = serde_json::from_str(body)
        .map_err(|e| shape_error(format!("submit response is malformed: {e}")))?;
    match wire.job_id {
        Some(job_id) if !job_id.trim().is_empty() => Ok(SubmitReceipt { job_id }),
        _ => Err(shape_error("submit response has no job_id")),
    }
}

/// Parses the body of `GET /stats`; `null` or an empty body means "not provided".
pub(crate) fn parse_stats(body: &str) -> Result<Option<ServiceStats>, ServiceClientError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let object = match parse_json(body)? {
        Value::Null => return Ok(None),
        Value::Object(object) => object,
        _ => return Err(shape_error("statistics are not an object")),
    };

    let stats = if ["byStatus", "by_status"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        nested_stats(&object)
    } else {
        flat_stats(&object)
    };

    if stats.by_status.is_empty() && stats.by_risk.is_empty() && stats.total.is_none() {
        return Err(shape_error("statistics carry no recognizable counts"));
    }
    Ok(Some(stats))
}

fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn nested_stats(object: &Map<String, Value>) -> ServiceStats {
    let mut stats = common_stats(object);

    if let Some(Value::Object(by_status)) = first_of(object, &["byStatus", "by_status"]) {
        for (key, value) in by_status {
            match (key.parse::<SubmissionStatus>(), count_value(value)) {
                (Ok(status), Some(count)) => *stats.by_status.entry(status).or_insert(0) += count,
                _ => warn!("Ignoring status bucket '{key}' in service statistics"),
            }
        }
    }

    if let Some(Value::Object(by_risk)) = first_of(object, &["byRisk", "by_risk"]) {
        add_risk_counts(&mut stats.by_risk, by_risk.iter());
    }

    if let Some(Value::Object(by_hour)) = first_of(object, &["byHour", "by_hour"]) {
        let mut hours = BTreeMap::new();
        for (key, value) in by_hour {
            match (parse_hour(key), count_value(value)) {
                (Some(hour), Some(count)) => *hours.entry(hour).or_insert(0) += count,
                _ => warn!("Ignoring hour bucket '{key}' in service statistics"),
            }
        }
        stats.by_hour = Some(hours);
    } else if let Some(Value::Array(series)) = first_of(object, &["byHourArray", "by_hour_array"]) {
        let mut hours = BTreeMap::new();
        for entry in series {
            let hour = entry.get("hour").and_then(|h| match h {
                Value::String(s) => parse_hour(s),
                other => other.as_u64().and_then(|h| u32::try_from(h).ok()),
            });
            match (hour, entry.get("count").and_then(count_value)) {
                (Some(hour), Some(count)) if hour < 24 => *hours.entry(hour).or_insert(0) += count,
                _ => warn!("Ignoring hour series entry {entry} in service statistics"),
            }
        }
        stats.by_hour = Some(hours);
    }

    stats
}

fn flat_stats(object: &Map<String, Value>) -> ServiceStats {
    let mut stats = common_stats(object);

    for status in SubmissionStatus::iter() {
        if let Some(count) = object.get(status.as_str()).and_then(count_value) {
            stats.by_status.insert(status, count);
        }
    }
    add_risk_counts(
        &mut stats.by_risk,
        object
            .iter()
            .filter(|(key, _)| key.parse::<RiskLevel>().is_ok()),
    );

    stats
}

fn common_stats(object: &Map<String, Value>) -> ServiceStats {
    ServiceStats {
        total: object.get("total").and_then(count_value),
        avg_processing_time_seconds: first_of(
            object,
            &["avg_processing_time_seconds", "avgProcessingTimeSeconds"],
        )
        .and_then(Value::as_f64),
        today_count: first_of(object, &["today_count", "todayCount"]).and_then(count_value),
        ..ServiceStats::default()
    }
}

/// Sums risk buckets; `médio` and `medio` land in the same bucket.
fn add_risk_counts<'a>(
    by_risk: &mut BTreeMap<RiskLevel, u64>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) {
    for (key, value) in entries {
        match (key.parse::<RiskLevel>(), count_value(value)) {
            (Ok(level), Some(count)) => *by_risk.entry(level).or_insert(0) += count,
            _ => warn!("Ignoring risk bucket '{key}' in service statistics"),
        }
    }
}

/// Accepts `"9"` and `"9h"`.
fn parse_hour(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_end_matches(['h', 'H'])
        .parse::<u32>()
        .ok()
        .filter(|hour| *hour < 24)
}

/// Reads a non-negative count from a number or numeric string; `null` is zero.
fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0),
        _ => None,
    }
}
