//! Status server data structures.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::error_handling::RefreshStats;
use crate::models::{HourBucket, StatsSnapshot};

/// Shared state for the status server
///
/// The watch loop publishes each new snapshot; handlers only read.
#[derive(Clone)]
pub struct StatusState {
    /// Latest snapshot, `None` until the first successful refresh
    pub latest: Arc<RwLock<Option<Arc<StatsSnapshot>>>>,
    /// Refresh outcomes of the publishing loop
    pub refresh_stats: Arc<RefreshStats>,
    /// When the watch started
    pub start_time: Arc<Instant>,
}

impl StatusState {
    /// Empty state; nothing is served under `/stats` until [`StatusState::publish`].
    pub fn new() -> Self {
        Self {
            latest: Arc::new(RwLock::new(None)),
            refresh_stats: Arc::new(RefreshStats::new()),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Replaces the served snapshot.
    pub async fn publish(&self, snapshot: StatsSnapshot) {
        *self.latest.write().await = Some(Arc::new(snapshot));
    }
}

impl Default for StatusState {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON response for `/stats` endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse<'a> {
    #[serde(flatten)]
    pub snapshot: &'a StatsSnapshot,
    /// Hour buckets ordered by numeric hour
    pub by_hour_array: Vec<HourBucket>,
    pub uptime_seconds: f64,
    pub refresh: RefreshCounts,
}

#[derive(Serialize)]
pub struct RefreshCounts {
    pub successes: usize,
    pub errors: usize,
    pub transport: usize,
    pub service: usize,
    pub data_shape: usize,
}
