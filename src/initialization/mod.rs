//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (plain or JSON)
//! - HTTP client
//! - The service client built on top of it
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::sync::Arc;

pub use client::init_client;
pub use logger::init_logger_with;

use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::service::{AnalysisService, HttpAnalysisService};

/// Builds the HTTP-backed service client for the configured base URL.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the HTTP client cannot be built.
pub fn init_service(config: &Config) -> Result<Arc<dyn AnalysisService>, InitializationError> {
    let client = init_client(config)?;
    Ok(Arc::new(HttpAnalysisService::new(
        client,
        config.base_url.clone(),
    )))
}
