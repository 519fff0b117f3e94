//! In-memory, refreshable view of the service's submissions.
//!
//! The store caches one page per [`ListQuery`]. A refresh replaces the cached
//! page only on success; on failure the previous page stays visible and the
//! error is handed back to the caller. Two refreshes of the same query never
//! overlap: the second is skipped, not queued.

mod auto_refresh;
mod pagination;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};

pub use auto_refresh::AutoRefreshHandle;
pub(crate) use auto_refresh::spawn_periodic;
pub use pagination::{page_count, PageRequest};

use crate::error_handling::ServiceClientError;
use crate::models::{SubmissionRecord, SubmissionStatus};
use crate::service::{AnalysisService, ListQuery, SubmissionPage};

/// Result of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// The service answered; the cache now holds this page.
    Fresh(Arc<SubmissionPage>),
    /// The service call failed; `page` is the previously cached page, if any.
    Stale {
        /// Last good page for the same query
        page: Option<Arc<SubmissionPage>>,
        /// Why the refresh failed
        error: ServiceClientError,
    },
    /// Another refresh of the same query was still in flight.
    Skipped {
        /// Last good page for the same query
        page: Option<Arc<SubmissionPage>>,
    },
}

impl Refresh {
    /// Page to display: the fresh one, or the last good one.
    pub fn page(&self) -> Option<&Arc<SubmissionPage>> {
        match self {
            Refresh::Fresh(page) => Some(page),
            Refresh::Stale { page, .. } | Refresh::Skipped { page } => page.as_ref(),
        }
    }

    /// Error of a failed refresh.
    pub fn error(&self) -> Option<&ServiceClientError> {
        match self {
            Refresh::Stale { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Whether the service answered this refresh.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Refresh::Fresh(_))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    pages: HashMap<ListQuery, Arc<SubmissionPage>>,
    in_flight: HashSet<ListQuery>,
}

/// Cache of submission pages fed by [`AnalysisService::list_submissions`].
///
/// Only the store's own refresh mutates the cache; readers get shared,
/// immutable pages.
pub struct SubmissionStore {
    service: Arc<dyn AnalysisService>,
    state: Mutex<StoreState>,
}

impl SubmissionStore {
    /// Creates an empty store.
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // The state is a plain cache; a panic elsewhere cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last good page for `query`, without contacting the service.
    pub fn cached(&self, query: &ListQuery) -> Option<Arc<SubmissionPage>> {
        self.lock().pages.get(query).cloned()
    }

    /// Fetches `query` from the service and updates the cache.
    ///
    /// Records keep the order the service returned them in. A page past the
    /// last one comes back empty with the true total.
    pub async fn refresh(&self, query: ListQuery) -> Refresh {
        let _in_flight = match InFlightGuard::acquire(self, query) {
            Some(guard) => guard,
            None => {
                debug!("Refresh of {query:?} already in flight; skipping");
                return Refresh::Skipped {
                    page: self.cached(&query),
                };
            }
        };

        match self.service.list_submissions(&query).await {
            Ok(page) => {
                let page = Arc::new(page);
                self.lock().pages.insert(query, Arc::clone(&page));
                debug!(
                    "Refreshed {query:?}: {} records of {}",
                    page.records.len(),
                    page.total
                );
                Refresh::Fresh(page)
            }
            Err(error) => {
                warn!("Refresh of {query:?} failed, keeping previous page: {error}");
                Refresh::Stale {
                    page: self.cached(&query),
                    error,
                }
            }
        }
    }

    /// Refreshes one page of the optionally status-filtered listing.
    pub async fn refresh_page(
        &self,
        status: Option<SubmissionStatus>,
        page: PageRequest,
    ) -> Refresh {
        self.refresh(page.query(status)).await
    }

    /// Re-fetches `query` every `every` until the handle is dropped.
    ///
    /// `on_update` receives each refresh outcome, including skipped and stale
    /// ones, so a consumer can show an error banner over the last good page.
    pub fn auto_refresh<F>(
        self: &Arc<Self>,
        query: ListQuery,
        every: Duration,
        on_update: F,
    ) -> AutoRefreshHandle
    where
        F: FnMut(Refresh) + Send + 'static,
    {
        let store = Arc::clone(self);
        let on_update = Arc::new(Mutex::new(on_update));
        spawn_periodic(every, move || {
            let store = Arc::clone(&store);
            let on_update = Arc::clone(&on_update);
            async move {
                let refresh = store.refresh(query).await;
                let mut callback = on_update.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)(refresh);
            }
        })
    }
}

impl std::fmt::Debug for SubmissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SubmissionStore")
            .field("cached_pages", &state.pages.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

/// Marks a query as being refreshed; released on drop, including on error
/// paths and when the refreshing future is abandoned.
struct InFlightGuard<'a> {
    store: &'a SubmissionStore,
    query: ListQuery,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(store: &'a SubmissionStore, query: ListQuery) -> Option<Self> {
        let newly_marked = store.lock().in_flight.insert(query);
        // The lock is released before a guard exists, so no guard is ever dropped under it.
        if !newly_marked {
            return None;
        }
        Some(Self { store, query })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.lock().in_flight.remove(&self.query);
    }
}

/// Records of `page` whose URL or job id contains `term`, ignoring case.
///
/// A refinement over an already-fetched page; nothing is re-fetched.
pub fn search<'a>(page: &'a SubmissionPage, term: &str) -> Vec<&'a SubmissionRecord> {
    page.records
        .iter()
        .filter(|record| record.matches_search(term))
        .collect()
}
