//! Error categorization.
//!
//! Maps `reqwest` failures and non-success responses onto the
//! [`ServiceClientError`] taxonomy.

use super::types::ServiceClientError;

/// Categorizes a `reqwest::Error` into a `ServiceClientError`.
///
/// - Errors carrying an HTTP status become `Service`
/// - Body decode failures become `DataShape`
/// - Everything else (connect, timeout, request, body) is `Transport`
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ServiceClientError {
    if let Some(status) = error.status() {
        return ServiceClientError::Service {
            status: status.as_u16(),
            detail: error.to_string(),
        };
    }

    if error.is_decode() {
        ServiceClientError::DataShape(error.to_string())
    } else if error.is_timeout() {
        ServiceClientError::Transport(format!("request timed out: {error}"))
    } else if error.is_connect() {
        ServiceClientError::Transport(format!("connection failed: {error}"))
    } else {
        ServiceClientError::Transport(error.to_string())
    }
}

/// Builds a `Service` error from a non-success status and its body.
///
/// The service reports failures as `{"detail": "..."}`; when the body has that
/// shape only the detail is kept, otherwise the trimmed body (or the canonical
/// reason phrase for an empty body) is used.
pub fn service_error_from_body(status: reqwest::StatusCode, body: &str) -> ServiceClientError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

    ServiceClientError::Service {
        status: status.as_u16(),
        detail,
    }
}
