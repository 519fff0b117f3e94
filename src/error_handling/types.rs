//! Error type definitions.
//!
//! This module defines the error taxonomy used throughout the crate:
//! transport, service, timeout and data-shape failures, plus the errors
//! raised while initializing the application.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The configured service base URL is unusable.
    #[error("Invalid service base URL: {0}")]
    InvalidBaseUrlError(String),
}

/// Errors produced while talking to the remote analysis service.
///
/// Cloneable so a failed refresh can hand the same error to every consumer
/// that observes it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceClientError {
    /// The service could not be reached (connect, timeout, broken body).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("Service responded with HTTP {status}: {detail}")]
    Service {
        /// HTTP status code
        status: u16,
        /// `detail` field of the error body, or the raw body
        detail: String,
    },

    /// The response was missing fields or carried values outside the contract.
    #[error("Unexpected response shape: {0}")]
    DataShape(String),
}

impl ServiceClientError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceClientError::Transport(_) => ErrorKind::Transport,
            ServiceClientError::Service { .. } => ErrorKind::Service,
            ServiceClientError::DataShape(_) => ErrorKind::DataShape,
        }
    }
}

/// Errors surfaced by the tracking API to its callers.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// A poll session was requested for an empty job id.
    #[error("Job id must not be empty")]
    EmptyJobId,

    /// The URL offered for submission was rejected before reaching the service.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The service call failed.
    #[error(transparent)]
    Service(#[from] ServiceClientError),

    /// The poll session was cancelled before reaching a terminal state.
    #[error("Tracking of job {0} was cancelled")]
    Cancelled(String),
}

impl TrackerError {
    /// Category of this error, if it belongs to the service taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TrackerError::Service(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// The four failure categories a user can run into.
///
/// Each one implies a different next step, so each has its own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorKind {
    /// Network or connection failure
    Transport,
    /// Non-success HTTP status from the service
    Service,
    /// Polling bound exceeded without a terminal state
    Timeout,
    /// Response did not match the expected shape
    DataShape,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorKind {
    /// Short label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport error",
            ErrorKind::Service => "service error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DataShape => "data shape error",
        }
    }

    /// Human-readable message telling the user what to do next.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Transport => {
                "Could not reach the analysis service. Check your connection and try again."
            }
            ErrorKind::Service => {
                "The analysis service rejected the request. Please submit the URL again."
            }
            ErrorKind::Timeout => {
                "The analysis is taking longer than expected. Check back later, it may still complete."
            }
            ErrorKind::DataShape => {
                "The analysis service sent a response this client does not understand."
            }
        }
    }
}
