//! Shared data shapes: submission records and statistics snapshots.

mod stats;
mod submission;

pub use stats::{HourBucket, ServiceStats, StatsSnapshot, StatsSource};
pub use submission::{
    AnalysisResult, Check, Lifecycle, RiskLevel, SubmissionRecord, SubmissionStatus,
    UnknownRiskLevel,
};
