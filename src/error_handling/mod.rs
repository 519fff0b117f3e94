//! Error handling.
//!
//! This module provides:
//! - Error type definitions ([`ServiceClientError`], [`TrackerError`],
//!   [`InitializationError`])
//! - Categorization of `reqwest` failures into the service taxonomy
//! - User-facing messages per [`ErrorKind`]
//! - Refresh failure counters ([`RefreshStats`])
//!
//! Errors are categorized into:
//! - **Transport**: the service could not be reached
//! - **Service**: the service answered with a non-success status
//! - **Timeout**: polling gave up before the job reached a terminal state
//! - **DataShape**: the response did not match the expected contract

mod categorization;
mod stats;
mod types;

pub use categorization::{categorize_reqwest_error, service_error_from_body};
pub use stats::RefreshStats;
pub use types::{ErrorKind, InitializationError, ServiceClientError, TrackerError};
