//! Continuously refreshed views.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use colored::*;
use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::app::{render_page, render_snapshot};
use crate::config::{Config, LIVE_REFRESH_INTERVAL, STATS_REFRESH_INTERVAL};
use crate::error_handling::ServiceClientError;
use crate::models::StatsSnapshot;
use crate::service::AnalysisService;
use crate::stats::StatsAggregator;
use crate::status_server::{start_status_server, StatusState};
use crate::store::{PageRequest, Refresh, SubmissionStore};

enum Update {
    List(Refresh),
    Stats(Result<StatsSnapshot, ServiceClientError>),
}

/// Refreshes the live list (or statistics) until Ctrl-C.
///
/// With a status port configured, refresh counters are served over HTTP. Only
/// the statistics view publishes a snapshot; in list mode `/stats` stays
/// unavailable since one page of submissions says nothing about the totals.
pub(super) async fn watch(
    service: Arc<dyn AnalysisService>,
    config: &Config,
    stats_view: bool,
) -> Result<ExitCode> {
    let state = StatusState::new();
    if let Some(port) = config.status_port {
        let server_state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = start_status_server(port, server_state).await {
                error!("{e:#}");
            }
        });
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    // Held for the whole loop; dropping it stops the refresh on every exit path.
    let _refresh = if stats_view {
        let aggregator = Arc::new(StatsAggregator::new(service));
        aggregator.auto_refresh(STATS_REFRESH_INTERVAL, move |snapshot| {
            let _ = tx.send(Update::Stats(snapshot));
        })
    } else {
        let store = Arc::new(SubmissionStore::new(service));
        let query = PageRequest::new(1, config.page_limit).query(None);
        store.auto_refresh(query, LIVE_REFRESH_INTERVAL, move |refresh| {
            let _ = tx.send(Update::List(refresh));
        })
    };
    info!(
        "Watching {} every {:?}; press Ctrl-C to stop",
        if stats_view { "statistics" } else { "submissions" },
        if stats_view {
            STATS_REFRESH_INTERVAL
        } else {
            LIVE_REFRESH_INTERVAL
        }
    );

    let request = PageRequest::new(1, config.page_limit);
    let mut last_snapshot: Option<StatsSnapshot> = None;

    loop {
        let update = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
            update = rx.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        println!(
            "{}",
            format!("── {} ──", Local::now().format("%H:%M:%S")).dimmed()
        );
        match update {
            Update::List(refresh) => print!("{}", list_update(&state, &refresh, request)),
            Update::Stats(Ok(snapshot)) => {
                state.refresh_stats.record_success();
                print!("{}", render_snapshot(&snapshot));
                state.publish(snapshot.clone()).await;
                last_snapshot = Some(snapshot);
            }
            Update::Stats(Err(e)) => {
                warn!("Statistics refresh failed: {e}");
                state.refresh_stats.record_error(&e);
                println!("{}", e.kind().user_message().yellow());
                if let Some(snapshot) = &last_snapshot {
                    println!("{}", "Showing the last snapshot.".dimmed());
                    print!("{}", render_snapshot(snapshot));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Counts the refresh outcome and renders the page to show.
fn list_update(state: &StatusState, refresh: &Refresh, request: PageRequest) -> String {
    let mut out = String::new();
    match refresh {
        Refresh::Fresh(_) => state.refresh_stats.record_success(),
        Refresh::Stale { error, .. } => {
            state.refresh_stats.record_error(error);
            out.push_str(&format!(
                "{}\n",
                format!("{} Showing the last loaded page.", error.kind().user_message()).yellow()
            ));
        }
        Refresh::Skipped { .. } => {}
    }
    if let Some(page) = refresh.page() {
        let visible: Vec<_> = page.records.iter().collect();
        out.push_str(&render_page(page, &visible, request));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorKind;
    use crate::models::{Lifecycle, SubmissionRecord};
    use crate::service::SubmissionPage;
    use chrono::{TimeZone, Utc};

    fn page() -> Arc<SubmissionPage> {
        let created = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        Arc::new(SubmissionPage {
            records: vec![SubmissionRecord::new(
                "job-1",
                "https://job-1.example",
                created,
                Lifecycle::Queued,
            )],
            total: 120,
        })
    }

    #[tokio::test]
    async fn test_list_refresh_counts_without_publishing_stats() {
        let state = StatusState::new();
        let request = PageRequest::new(1, 20);

        let text = list_update(&state, &Refresh::Fresh(page()), request);
        assert!(text.contains("job-1"));
        assert_eq!(state.refresh_stats.successes(), 1);
        assert!(state.latest.read().await.is_none());

        let stale = Refresh::Stale {
            page: Some(page()),
            error: ServiceClientError::Transport("connection refused".into()),
        };
        let text = list_update(&state, &stale, request);
        assert!(text.contains("Showing the last loaded page."));
        assert!(text.contains("job-1"));
        assert_eq!(state.refresh_stats.error_count(ErrorKind::Transport), 1);
        assert!(state.latest.read().await.is_none());
    }
}
