//! JSON statistics handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::super::types::{RefreshCounts, StatsResponse, StatusState};
use crate::error_handling::ErrorKind;

/// JSON endpoint with the latest snapshot and its ordered hour series
pub async fn stats_handler(State(state): State<StatusState>) -> Response {
    let Some(snapshot) = state.latest.read().await.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "application/json")],
            r#"{"error":"no statistics collected yet"}"#,
        )
            .into_response();
    };

    let stats = &state.refresh_stats;
    let response = StatsResponse {
        snapshot: &snapshot,
        by_hour_array: snapshot.by_hour_series(),
        uptime_seconds: state.start_time.elapsed().as_secs_f64(),
        refresh: RefreshCounts {
            successes: stats.successes(),
            errors: stats.total_errors(),
            transport: stats.error_count(ErrorKind::Transport),
            service: stats.error_count(ErrorKind::Service),
            data_shape: stats.error_count(ErrorKind::DataShape),
        },
    };

    let json = match serde_json::to_string_pretty(&response) {
        Ok(json) => json,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize statistics: {}", e),
            )
                .into_response();
        }
    };

    (StatusCode::OK, [("content-type", "application/json")], json).into_response()
}
