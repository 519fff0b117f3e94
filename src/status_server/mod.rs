//! HTTP status server for long-running watches.
//!
//! Provides two endpoints:
//! - `/metrics` - Prometheus-compatible metrics
//! - `/stats` - JSON view of the latest statistics snapshot
//!
//! The server runs in the background and only reads what the watch loop publishes.

mod handlers;
mod types;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use handlers::{metrics_handler, stats_handler};
pub use types::StatusState;

fn router(state: StatusState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Creates and starts the status server
pub async fn start_status_server(port: u16, state: StatusState) -> Result<(), anyhow::Error> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind status server to port {}: {}", port, e))?;

    log::info!("Status server listening on http://127.0.0.1:{}/", port);
    log::info!("  - Metrics: http://127.0.0.1:{}/metrics", port);
    log::info!("  - Stats: http://127.0.0.1:{}/stats", port);

    serve(listener, state).await
}

async fn serve(listener: TcpListener, state: StatusState) -> Result<(), anyhow::Error> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Status server error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ServiceClientError;
    use crate::models::{StatsSource, SubmissionRecord};
    use crate::models::{AnalysisResult, Lifecycle, RiskLevel};
    use crate::stats::StatsAggregator;
    use chrono::{TimeZone, Utc};

    async fn spawn_server(state: StatusState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));
        format!("http://{addr}")
    }

    fn snapshot() -> crate::models::StatsSnapshot {
        let created = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();
        let records = vec![
            SubmissionRecord::new(
                "a",
                "https://a.example",
                created,
                Lifecycle::Done {
                    result: AnalysisResult {
                        level: Some(RiskLevel::Medio),
                        score: 40,
                        checks: Vec::new(),
                        tips: Vec::new(),
                    },
                    processed_at: created,
                },
            ),
            SubmissionRecord::new("b", "https://b.example", created, Lifecycle::Queued),
        ];
        StatsAggregator::aggregate_in(&records, &Utc, created)
    }

    #[tokio::test]
    async fn test_stats_unavailable_before_first_publish() {
        let base = spawn_server(StatusState::new()).await;
        let response = reqwest::get(format!("{base}/stats")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stats_serves_published_snapshot() {
        let state = StatusState::new();
        state.publish(snapshot()).await;
        state.refresh_stats.record_success();
        let base = spawn_server(state).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/stats"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["total"], 2);
        assert_eq!(body["byStatus"]["done"], 1);
        assert_eq!(body["byRisk"]["médio"], 1);
        assert_eq!(body["byHourArray"][0]["hour"], "14h");
        assert_eq!(body["source"], serde_json::json!(StatsSource::Derived));
        assert_eq!(body["refresh"]["successes"], 1);
    }

    #[tokio::test]
    async fn test_metrics_lists_buckets_and_errors() {
        let state = StatusState::new();
        state.publish(snapshot()).await;
        state
            .refresh_stats
            .record_error(&ServiceClientError::Transport("refused".into()));
        let base = spawn_server(state).await;

        let text = reqwest::get(format!("{base}/metrics"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.contains("submission_tracker_submissions 2"));
        assert!(text.contains("submission_tracker_submissions_by_status{status=\"queued\"} 1"));
        assert!(text.contains("submission_tracker_submissions_by_risk{level=\"médio\"} 1"));
        assert!(text.contains("submission_tracker_refresh_errors_total{kind=\"transport_error\"} 1"));
    }

    #[tokio::test]
    async fn test_port_already_in_use_is_an_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let err = start_status_server(port, StatusState::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to bind status server"));
    }
}
