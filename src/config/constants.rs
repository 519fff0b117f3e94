//! Application constants.
//!
//! Defaults for the remote service, polling bounds, refresh cadences and
//! pagination. Everything here can be overridden through [`crate::Config`].

use std::time::Duration;

/// Base URL of the remote analysis service when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable consulted for the service base URL.
pub const BASE_URL_ENV_VAR: &str = "SUBMISSION_TRACKER_API_URL";

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// TCP connect timeout in seconds.
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;

// Polling
/// Fixed delay between two status checks of the same job.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Number of non-terminal observations tolerated before giving up (~60s at 2s).
pub const MAX_POLL_ATTEMPTS: u32 = 30;

// Refresh cadences
/// Re-fetch cadence for live submission lists.
pub const LIVE_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
/// Re-fetch cadence for statistics-oriented views.
pub const STATS_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

// Pagination
/// Page size used by list views.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Page size used when loading the collection that feeds derived statistics.
pub const STATS_SOURCE_LIMIT: u32 = 100;
/// Number of submissions shown on the dashboard's "recent" panel.
pub const RECENT_SUBMISSIONS: usize = 10;

// Submission validation
/// Maximum accepted URL length (matches common browser and server limits).
pub const MAX_URL_LENGTH: usize = 2048;
