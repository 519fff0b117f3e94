//! Statistics snapshot types.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;

use super::submission::{RiskLevel, SubmissionStatus};

/// Where a snapshot's distributions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    /// Pre-aggregated by the service (`GET /stats`)
    Service,
    /// Derived locally from a submission collection
    Derived,
}

/// One bar of the hour-of-day chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    /// Label such as `"9h"`
    pub hour: String,
    /// Submissions created during that hour
    pub count: u64,
}

/// Point-in-time aggregate over a submission collection.
///
/// Snapshots are immutable: a refresh builds a new one and consumers swap it
/// in whole. Every status and risk bucket is always present, zeroed when
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    total: u64,
    by_status: BTreeMap<SubmissionStatus, u64>,
    by_risk: BTreeMap<RiskLevel, u64>,
    by_hour: BTreeMap<u32, u64>,
    avg_processing_time_seconds: Option<f64>,
    today_count: Option<u64>,
    source: StatsSource,
}

impl StatsSnapshot {
    /// All-zero snapshot.
    pub fn empty(source: StatsSource) -> Self {
        Self {
            total: 0,
            by_status: SubmissionStatus::iter().map(|s| (s, 0)).collect(),
            by_risk: RiskLevel::iter().map(|r| (r, 0)).collect(),
            by_hour: BTreeMap::new(),
            avg_processing_time_seconds: None,
            today_count: None,
            source,
        }
    }

    /// Assembles a snapshot; `total` is the sum of the status counts.
    pub(crate) fn from_parts(
        by_status: BTreeMap<SubmissionStatus, u64>,
        by_risk: BTreeMap<RiskLevel, u64>,
        by_hour: BTreeMap<u32, u64>,
        avg_processing_time_seconds: Option<f64>,
        today_count: Option<u64>,
        source: StatsSource,
    ) -> Self {
        let mut snapshot = Self::empty(source);
        snapshot.by_status.extend(by_status);
        snapshot.by_risk.extend(by_risk);
        snapshot.by_hour = by_hour.into_iter().filter(|(h, _)| *h < 24).collect();
        snapshot.total = snapshot.by_status.values().sum();
        snapshot.avg_processing_time_seconds = avg_processing_time_seconds;
        snapshot.today_count = today_count;
        snapshot
    }

    /// Number of submissions covered.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count for one status.
    pub fn status_count(&self, status: SubmissionStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Count for one risk level.
    pub fn risk_count(&self, level: RiskLevel) -> u64 {
        self.by_risk.get(&level).copied().unwrap_or(0)
    }

    /// Status distribution (all four keys present).
    pub fn by_status(&self) -> &BTreeMap<SubmissionStatus, u64> {
        &self.by_status
    }

    /// Risk distribution (all three keys present).
    pub fn by_risk(&self) -> &BTreeMap<RiskLevel, u64> {
        &self.by_risk
    }

    /// Hour-of-day distribution, keyed 0-23.
    pub fn by_hour(&self) -> &BTreeMap<u32, u64> {
        &self.by_hour
    }

    /// Mean seconds from submission to terminal state.
    pub fn avg_processing_time_seconds(&self) -> Option<f64> {
        self.avg_processing_time_seconds
    }

    /// Submissions created today (local calendar day).
    pub fn today_count(&self) -> Option<u64> {
        self.today_count
    }

    /// Origin of the distributions.
    pub fn source(&self) -> StatsSource {
        self.source
    }

    /// Share of `status` in percent; 0 for an empty snapshot.
    pub fn status_percentage(&self, status: SubmissionStatus) -> f64 {
        percentage(self.status_count(status), self.total)
    }

    /// Share of `level` among classified submissions, in percent.
    pub fn risk_percentage(&self, level: RiskLevel) -> f64 {
        percentage(self.risk_count(level), self.by_risk.values().sum())
    }

    /// Hour buckets as a chart series, ascending by numeric hour.
    pub fn by_hour_series(&self) -> Vec<HourBucket> {
        // BTreeMap iterates in key order, so 9 comes before 10.
        self.by_hour
            .iter()
            .map(|(hour, count)| HourBucket {
                hour: format!("{hour}h"),
                count: *count,
            })
            .collect()
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Statistics as reported by the service, normalized from either wire shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceStats {
    /// Total the service reported, if any
    pub total: Option<u64>,
    /// Status counts that were reported
    pub by_status: BTreeMap<SubmissionStatus, u64>,
    /// Risk counts that were reported, accent variants merged
    pub by_risk: BTreeMap<RiskLevel, u64>,
    /// Hour counts, when the service provides them
    pub by_hour: Option<BTreeMap<u32, u64>>,
    /// Mean processing time in seconds
    pub avg_processing_time_seconds: Option<f64>,
    /// Submissions created today
    pub today_count: Option<u64>,
}
