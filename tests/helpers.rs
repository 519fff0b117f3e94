// Shared test helpers for mock service setup and response bodies.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::MockServer;

use submission_tracker::initialization::init_service;
use submission_tracker::{AnalysisService, Config};

/// Configuration pointing at the mock server.
#[allow(dead_code)] // Used by other test files
pub fn config_for(server: &MockServer) -> Config {
    Config::default()
        .with_base_url(&server.uri())
        .expect("mock server URI should be a valid base URL")
}

/// HTTP-backed service client talking to the mock server.
#[allow(dead_code)] // Used by other test files
pub fn service_for(server: &MockServer) -> Arc<dyn AnalysisService> {
    init_service(&config_for(server)).expect("Failed to build service client")
}

/// A non-terminal submission as the service serializes it.
#[allow(dead_code)] // Used by other test files
pub fn pending_json(job_id: &str, status: &str) -> Value {
    json!({
        "job_id": job_id,
        "url": format!("https://{job_id}.example"),
        "status": status,
        "result": null,
        "created_at": "2024-05-10T09:15:00Z",
        "processed_at": null
    })
}

/// A finished submission as the service serializes it.
#[allow(dead_code)] // Used by other test files
pub fn done_json(job_id: &str, level: &str, score: u8) -> Value {
    json!({
        "job_id": job_id,
        "url": format!("https://{job_id}.example"),
        "status": "done",
        "result": {
            "level": level,
            "score": score,
            "checks": [
                {"name": "HTTPS", "ok": true, "reason": "Certificate is valid"}
            ],
            "tips": ["Never enter passwords on unknown sites"]
        },
        "created_at": "2024-05-10T14:03:00Z",
        "processed_at": "2024-05-10T14:03:04Z"
    })
}
