//! HTTP client initialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, TCP_CONNECT_TIMEOUT_SECS};

/// User-Agent sent with every request to the analysis service.
const USER_AGENT: &str = concat!("submission_tracker/", env!("CARGO_PKG_VERSION"));

/// Initializes the HTTP client used for all service calls.
///
/// Creates a `reqwest::Client` configured with:
/// - Overall request timeout from the configuration
/// - A shorter TCP connect timeout, so a dead service fails fast
/// - A crate-specific User-Agent
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let connect_timeout = Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS.min(config.timeout_seconds));
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(connect_timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
