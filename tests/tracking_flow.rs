//! End-to-end tracking against a mock analysis service.
//!
//! Polling uses a millisecond interval so each test finishes quickly while
//! still exercising the real scheduler and HTTP client.

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{config_for, done_json, pending_json, service_for};
use submission_tracker::{
    submit_and_track, PageRequest, PollCallbacks, PollFailure, PollOutcome, PollState,
    ResultPoller, SubmissionStatus, SubmissionStore,
};

const FAST_POLL: Duration = Duration::from_millis(10);

async fn mount_status_sequence(
    server: &MockServer,
    job_id: &str,
    pending: u64,
    terminal: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(format!("/submission/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_json(job_id, "processing")))
        .up_to_n_times(pending)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/submission/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(terminal))
        .mount(server)
        .await;
}

fn poller_for(server: &MockServer, max_attempts: u32) -> ResultPoller {
    ResultPoller::new(service_for(server), &config_for(server)).with_limits(FAST_POLL, max_attempts)
}

#[tokio::test]
async fn test_poll_resolves_after_processing() {
    let server = MockServer::start().await;
    mount_status_sequence(&server, "job-1", 2, done_json("job-1", "baixo", 12)).await;

    let outcome = poller_for(&server, 10).poll("job-1").await.unwrap();
    match outcome {
        PollOutcome::Resolved(record) => {
            assert_eq!(record.status(), SubmissionStatus::Done);
            assert_eq!(record.result().map(|r| r.score), Some(12));
        }
        other => panic!("expected a resolved outcome, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_poll_times_out_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_json("slow", "queued")))
        .mount(&server)
        .await;

    let outcome = poller_for(&server, 3).poll("slow").await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::TimedOut {
            job_id: "slow".into(),
            attempts: 3
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_poll_reports_failed_job() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        "job-f",
        1,
        json!({
            "job_id": "job-f",
            "url": "https://job-f.example",
            "status": "failed",
            "created_at": "2024-05-10T09:15:00Z",
            "processed_at": "2024-05-10T09:15:20Z",
            "error_message": "Timeout fetching page"
        }),
    )
    .await;

    let outcome = poller_for(&server, 10).poll("job-f").await.unwrap();
    match outcome {
        PollOutcome::Failed(PollFailure::JobFailed(record)) => {
            assert_eq!(record.error_message(), Some("Timeout fetching page"));
        }
        other => panic!("expected a failed job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_error_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Submission not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = poller_for(&server, 10).poll("gone").await.unwrap();
    assert!(matches!(
        outcome,
        PollOutcome::Failed(PollFailure::PollError(_))
    ));
}

#[tokio::test]
async fn test_callbacks_fire_exactly_once() {
    let server = MockServer::start().await;
    mount_status_sequence(&server, "job-cb", 1, done_json("job-cb", "alto", 90)).await;

    let fired = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = oneshot::channel();
    let on_resolved = {
        let fired = Arc::clone(&fired);
        move |record: submission_tracker::SubmissionRecord| {
            fired.lock().unwrap().push(format!("resolved:{}", record.job_id()));
            let _ = done_tx.send(());
        }
    };
    let on_failed = {
        let fired = Arc::clone(&fired);
        move |_: PollFailure| fired.lock().unwrap().push("failed".to_string())
    };
    let on_timeout = {
        let fired = Arc::clone(&fired);
        move || fired.lock().unwrap().push("timeout".to_string())
    };

    let session = poller_for(&server, 10)
        .start("job-cb", PollCallbacks::new(on_resolved, on_failed, on_timeout))
        .unwrap();
    done_rx.await.unwrap();
    session.closed().await;

    assert_eq!(session.state(), PollState::Resolved);
    assert_eq!(*fired.lock().unwrap(), ["resolved:job-cb"]);
    // Cancelling a finished session changes nothing.
    assert!(!session.cancel());
    assert_eq!(session.state(), PollState::Resolved);
}

#[tokio::test]
async fn test_cancelled_session_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/job-c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_json("job-c", "processing")))
        .mount(&server)
        .await;

    let fired = Arc::new(Mutex::new(0u32));
    let callbacks = {
        let (a, b, c) = (Arc::clone(&fired), Arc::clone(&fired), Arc::clone(&fired));
        PollCallbacks::new(
            move |_| *a.lock().unwrap() += 1,
            move |_| *b.lock().unwrap() += 1,
            move || *c.lock().unwrap() += 1,
        )
    };
    let session = poller_for(&server, 1_000)
        .with_limits(Duration::from_millis(50), 1_000)
        .start("job-c", callbacks)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(session.cancel());
    assert!(!session.cancel());
    session.closed().await;
    let seen = server.received_requests().await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.state(), PollState::Cancelled);
    assert_eq!(*fired.lock().unwrap(), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
}

#[tokio::test]
async fn test_submit_and_track_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-e2e", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_status_sequence(&server, "job-e2e", 1, done_json("job-e2e", "médio", 55)).await;

    let tracked = submit_and_track(&poller_for(&server, 5), "https://job-e2e.example", None)
        .await
        .unwrap();
    assert_eq!(tracked.job_id, "job-e2e");
    assert!(matches!(tracked.outcome, PollOutcome::Resolved(_)));
}

#[tokio::test]
async fn test_store_pages_through_listing() {
    let server = MockServer::start().await;
    let page_three: Vec<_> = (40..45)
        .map(|i| pending_json(&format!("job-{i}"), "queued"))
        .collect();
    Mock::given(method("GET"))
        .and(path("/submissions"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "submissions": page_three,
            "total": 45
        })))
        .mount(&server)
        .await;

    let store = SubmissionStore::new(service_for(&server));
    let request = PageRequest::new(3, 20);
    let refresh = store.refresh_page(None, request).await;
    assert!(refresh.is_fresh());
    let page = refresh.page().unwrap();
    assert_eq!(page.records.len(), 5);
    assert_eq!(page.records[0].job_id(), "job-40");
    assert_eq!(submission_tracker::page_count(page.total, request.limit()), 3);
    assert!(store.cached(&request.query(None)).is_some());
}

#[tokio::test]
async fn test_store_keeps_stale_page_when_service_breaks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pending_json("job-1", "queued")])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/submissions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let store = SubmissionStore::new(service_for(&server));
    let request = PageRequest::new(1, 20);
    assert!(store.refresh_page(None, request).await.is_fresh());

    let refresh = store.refresh_page(None, request).await;
    assert!(!refresh.is_fresh());
    assert!(refresh.error().is_some());
    assert_eq!(refresh.page().unwrap().records[0].job_id(), "job-1");
}
