//! Refresh error tracking.
//!
//! Counts service failures by [`ErrorKind`] across background refreshes so a
//! long-running watch can report how healthy its data source has been.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;

use super::types::{ErrorKind, ServiceClientError};

/// Thread-safe refresh statistics.
///
/// Every [`ErrorKind`] is initialized to zero on creation, so reads never miss
/// a bucket. Shareable across tasks behind an `Arc`.
#[derive(Debug)]
pub struct RefreshStats {
    successes: AtomicUsize,
    errors: HashMap<ErrorKind, AtomicUsize>,
}

impl RefreshStats {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for kind in ErrorKind::iter() {
            errors.insert(kind, AtomicUsize::new(0));
        }
        RefreshStats {
            successes: AtomicUsize::new(0),
            errors,
        }
    }

    /// Records a refresh that reached the service.
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed refresh under its error kind.
    pub fn record_error(&self, error: &ServiceClientError) {
        if let Some(counter) = self.errors.get(&error.kind()) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "No refresh counter for {:?}; RefreshStats was built without it",
                error.kind()
            );
        }
    }

    /// Successful refreshes so far.
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::Relaxed)
    }

    /// Failed refreshes of one kind.
    pub fn error_count(&self, kind: ErrorKind) -> usize {
        self.errors
            .get(&kind)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Failed refreshes of every kind.
    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl Default for RefreshStats {
    fn default() -> Self {
        Self::new()
    }
}
