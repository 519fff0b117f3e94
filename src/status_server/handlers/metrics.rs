//! Prometheus metrics handler.

use std::fmt::Write;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use strum::IntoEnumIterator;

use super::super::types::StatusState;
use crate::error_handling::ErrorKind;
use crate::models::{RiskLevel, SubmissionStatus};

/// Prometheus-compatible metrics endpoint
pub async fn metrics_handler(State(state): State<StatusState>) -> Response {
    let snapshot = state.latest.read().await.clone();
    let stats = &state.refresh_stats;
    let mut metrics = String::new();

    let _ = write!(
        metrics,
        r#"# HELP submission_tracker_refresh_success_total Refreshes that reached the service
# TYPE submission_tracker_refresh_success_total counter
submission_tracker_refresh_success_total {}

# HELP submission_tracker_refresh_errors_total Failed refreshes by error kind
# TYPE submission_tracker_refresh_errors_total counter
"#,
        stats.successes()
    );
    for kind in ErrorKind::iter() {
        let _ = writeln!(
            metrics,
            "submission_tracker_refresh_errors_total{{kind=\"{}\"}} {}",
            kind.as_str().replace(' ', "_"),
            stats.error_count(kind)
        );
    }

    if let Some(snapshot) = snapshot {
        let _ = write!(
            metrics,
            r#"
# HELP submission_tracker_submissions Submissions in the latest snapshot
# TYPE submission_tracker_submissions gauge
submission_tracker_submissions {}

# HELP submission_tracker_submissions_by_status Submissions per lifecycle status
# TYPE submission_tracker_submissions_by_status gauge
"#,
            snapshot.total()
        );
        for status in SubmissionStatus::iter() {
            let _ = writeln!(
                metrics,
                "submission_tracker_submissions_by_status{{status=\"{}\"}} {}",
                status,
                snapshot.status_count(status)
            );
        }

        let _ = write!(
            metrics,
            r#"
# HELP submission_tracker_submissions_by_risk Completed submissions per risk level
# TYPE submission_tracker_submissions_by_risk gauge
"#
        );
        for level in RiskLevel::iter() {
            let _ = writeln!(
                metrics,
                "submission_tracker_submissions_by_risk{{level=\"{}\"}} {}",
                level,
                snapshot.risk_count(level)
            );
        }

        if let Some(today) = snapshot.today_count() {
            let _ = write!(
                metrics,
                r#"
# HELP submission_tracker_submissions_today Submissions created today
# TYPE submission_tracker_submissions_today gauge
submission_tracker_submissions_today {}
"#,
                today
            );
        }
        if let Some(avg) = snapshot.avg_processing_time_seconds() {
            let _ = write!(
                metrics,
                r#"
# HELP submission_tracker_avg_processing_seconds Mean time from submission to terminal state
# TYPE submission_tracker_avg_processing_seconds gauge
submission_tracker_avg_processing_seconds {}
"#,
                avg
            );
        }
    }

    (StatusCode::OK, metrics).into_response()
}
