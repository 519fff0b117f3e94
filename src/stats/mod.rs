//! Statistics snapshots for dashboards.
//!
//! A snapshot comes from one of two interchangeable paths:
//! - the service's pre-aggregated `/stats`, normalized into [`StatsSnapshot`]
//! - local derivation over a submission collection via [`StatsAggregator::aggregate`]
//!
//! The service path is preferred; derivation is the fallback when `/stats` is
//! absent, `null` or failing.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use log::{debug, warn};

use crate::config::{RECENT_SUBMISSIONS, STATS_SOURCE_LIMIT};
use crate::error_handling::ServiceClientError;
use crate::models::{
    RiskLevel, ServiceStats, StatsSnapshot, StatsSource, SubmissionRecord, SubmissionStatus,
};
use crate::service::{AnalysisService, ListQuery};
use crate::store::{spawn_periodic, AutoRefreshHandle};

/// Statistics plus the most recent submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Aggregate over all submissions the snapshot could see
    pub snapshot: StatsSnapshot,
    /// Newest submissions, newest first
    pub recent: Vec<SubmissionRecord>,
}

/// Produces [`StatsSnapshot`]s from the service.
pub struct StatsAggregator {
    service: Arc<dyn AnalysisService>,
    source_limit: u32,
}

impl StatsAggregator {
    /// Creates an aggregator; derivation reads up to 100 of the newest records.
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            source_limit: STATS_SOURCE_LIMIT,
        }
    }

    /// Changes how many records the derivation path fetches, which is also
    /// the page size used when completing service statistics.
    pub fn with_source_limit(mut self, limit: u32) -> Self {
        self.source_limit = limit.max(1);
        self
    }

    /// Aggregates `records` with hours in local time.
    ///
    /// Pure and independent of input order. An empty slice yields an all-zero
    /// snapshot.
    pub fn aggregate(records: &[SubmissionRecord]) -> StatsSnapshot {
        Self::aggregate_in(records, &Local, Utc::now())
    }

    /// Aggregates `records`, bucketing hours and "today" in `tz` relative to `now`.
    pub fn aggregate_in<Tz: TimeZone>(
        records: &[SubmissionRecord],
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> StatsSnapshot {
        let mut by_status: BTreeMap<SubmissionStatus, u64> = BTreeMap::new();
        let mut by_risk: BTreeMap<RiskLevel, u64> = BTreeMap::new();
        let mut by_hour: BTreeMap<u32, u64> = BTreeMap::new();

        for record in records {
            *by_status.entry(record.status()).or_insert(0) += 1;
            if let Some(level) = record.result().and_then(|result| result.level) {
                *by_risk.entry(level).or_insert(0) += 1;
            }
            *by_hour
                .entry(record.created_at().with_timezone(tz).hour())
                .or_insert(0) += 1;
        }

        let extras = derived_extras(records, tz, now);
        StatsSnapshot::from_parts(
            by_status,
            by_risk,
            by_hour,
            extras.avg_processing_time_seconds,
            Some(extras.today_count),
            StatsSource::Derived,
        )
    }

    /// Builds a snapshot from service-reported statistics.
    ///
    /// Hour buckets and the averages the service did not report are derived
    /// from `records` (hours in `tz`). Those must be the complete collection the
    /// service counted; when they are not, the whole snapshot is derived from
    /// `records` instead so that every distribution covers the same submissions.
    pub fn from_service_in<Tz: TimeZone>(
        stats: ServiceStats,
        records: &[SubmissionRecord],
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> StatsSnapshot {
        let counted: u64 = stats.by_status.values().sum();
        if needs_completion(&stats) && records.len() as u64 != counted {
            warn!(
                "Service statistics count {counted} submissions but {} were listed; deriving from the listing",
                records.len()
            );
            return Self::aggregate_in(records, tz, now);
        }

        let by_hour = stats.by_hour.unwrap_or_else(|| {
            let mut by_hour = BTreeMap::new();
            for record in records {
                *by_hour
                    .entry(record.created_at().with_timezone(tz).hour())
                    .or_insert(0) += 1;
            }
            by_hour
        });

        let extras = derived_extras(records, tz, now);
        let snapshot = StatsSnapshot::from_parts(
            stats.by_status,
            stats.by_risk,
            by_hour,
            stats
                .avg_processing_time_seconds
                .or(extras.avg_processing_time_seconds),
            stats.today_count.or(Some(extras.today_count)),
            StatsSource::Service,
        );

        if let Some(reported) = stats.total {
            if reported != snapshot.total() {
                debug!(
                    "Service reported total {reported} but status buckets sum to {}",
                    snapshot.total()
                );
            }
        }
        snapshot
    }

    /// Current snapshot, from `/stats` when available, derived otherwise.
    ///
    /// # Errors
    ///
    /// Returns the listing error when `/stats` is unusable and the submission
    /// collection cannot be fetched either, or when `/stats` leaves out fields
    /// that only the full listing can fill in and that listing fails.
    pub async fn snapshot(&self) -> Result<StatsSnapshot, ServiceClientError> {
        match self.service.get_stats().await {
            Ok(Some(stats)) => {
                let records = if needs_completion(&stats) {
                    let counted = stats.by_status.values().sum();
                    self.fetch_covering(counted).await.map_err(|e| {
                        warn!("Could not load submissions to complete service statistics: {e}");
                        e
                    })?
                } else {
                    Vec::new()
                };
                Ok(Self::from_service_in(stats, &records, &Local, Utc::now()))
            }
            Ok(None) => {
                debug!("Service provides no statistics; deriving them locally");
                self.derive().await
            }
            Err(e) => {
                warn!("Fetching service statistics failed ({e}); deriving them locally");
                self.derive().await
            }
        }
    }

    /// Snapshot plus the most recent submissions.
    ///
    /// # Errors
    ///
    /// Propagates the first error of either fetch.
    pub async fn dashboard(&self) -> Result<Dashboard, ServiceClientError> {
        let recent_query = ListQuery {
            status: None,
            limit: RECENT_SUBMISSIONS as u32,
            offset: 0,
        };
        let (snapshot, recent) = tokio::join!(
            self.snapshot(),
            self.service.list_submissions(&recent_query)
        );
        let mut recent = recent?.records;
        recent.truncate(RECENT_SUBMISSIONS);
        Ok(Dashboard {
            snapshot: snapshot?,
            recent,
        })
    }

    /// Recomputes the snapshot every `every` until the handle is dropped.
    pub fn auto_refresh<F>(self: &Arc<Self>, every: Duration, on_update: F) -> AutoRefreshHandle
    where
        F: FnMut(Result<StatsSnapshot, ServiceClientError>) + Send + 'static,
    {
        let aggregator = Arc::clone(self);
        let on_update = Arc::new(std::sync::Mutex::new(on_update));
        spawn_periodic(every, move || {
            let aggregator = Arc::clone(&aggregator);
            let on_update = Arc::clone(&on_update);
            async move {
                let snapshot = aggregator.snapshot().await;
                let mut callback = on_update
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                (*callback)(snapshot);
            }
        })
    }

    async fn fetch_source(&self) -> Result<Vec<SubmissionRecord>, ServiceClientError> {
        let query = ListQuery {
            status: None,
            limit: self.source_limit,
            offset: 0,
        };
        Ok(self.service.list_submissions(&query).await?.records)
    }

    /// Pages through the listing until `expected` distinct submissions are
    /// loaded or the service runs out of records.
    async fn fetch_covering(
        &self,
        expected: u64,
    ) -> Result<Vec<SubmissionRecord>, ServiceClientError> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut offset = 0u32;

        while (records.len() as u64) < expected {
            let query = ListQuery {
                status: None,
                limit: self.source_limit,
                offset,
            };
            let page = self.service.list_submissions(&query).await?;
            if page.records.is_empty() {
                break;
            }
            offset = offset.saturating_add(page.records.len() as u32);
            // New submissions shift later pages; a record may show up twice.
            records.extend(
                page.records
                    .into_iter()
                    .filter(|record| seen.insert(record.job_id().to_string())),
            );
            if u64::from(offset) >= page.total {
                break;
            }
        }
        debug!("Loaded {} of {expected} submissions to complete statistics", records.len());
        Ok(records)
    }

    async fn derive(&self) -> Result<StatsSnapshot, ServiceClientError> {
        let records = self.fetch_source().await?;
        Ok(Self::aggregate(&records))
    }
}

impl std::fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("source_limit", &self.source_limit)
            .finish_non_exhaustive()
    }
}

/// Whether the service left out anything that has to come from the listing.
fn needs_completion(stats: &ServiceStats) -> bool {
    stats.by_hour.is_none()
        || stats.avg_processing_time_seconds.is_none()
        || stats.today_count.is_none()
}

struct DerivedExtras {
    avg_processing_time_seconds: Option<f64>,
    today_count: u64,
}

fn derived_extras<Tz: TimeZone>(
    records: &[SubmissionRecord],
    tz: &Tz,
    now: DateTime<Utc>,
) -> DerivedExtras {
    let today = now.with_timezone(tz).date_naive();
    let durations: Vec<f64> = records
        .iter()
        .filter_map(SubmissionRecord::processing_seconds)
        .collect();

    DerivedExtras {
        avg_processing_time_seconds: if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        },
        today_count: records
            .iter()
            .filter(|record| record.created_at().with_timezone(tz).date_naive() == today)
            .count() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Lifecycle};
    use crate::service::{HealthReport, SubmissionPage, SubmitReceipt, SubmitRequest};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, FixedOffset};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strum::IntoEnumIterator;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 15, 0).unwrap()
    }

    fn done(id: &str, created: DateTime<Utc>, level: Option<RiskLevel>) -> SubmissionRecord {
        SubmissionRecord::new(
            id,
            format!("https://{id}.example"),
            created,
            Lifecycle::Done {
                result: AnalysisResult {
                    level,
                    score: 50,
                    checks: Vec::new(),
                    tips: Vec::new(),
                },
                processed_at: created + ChronoDuration::seconds(4),
            },
        )
    }

    fn with_status(id: &str, created: DateTime<Utc>, status: SubmissionStatus) -> SubmissionRecord {
        let lifecycle = match status {
            SubmissionStatus::Queued => Lifecycle::Queued,
            SubmissionStatus::Processing => Lifecycle::Processing,
            SubmissionStatus::Done => return done(id, created, Some(RiskLevel::Baixo)),
            SubmissionStatus::Failed => Lifecycle::Failed {
                processed_at: created + ChronoDuration::seconds(2),
                error_message: None,
            },
        };
        SubmissionRecord::new(id, format!("https://{id}.example"), created, lifecycle)
    }

    #[test]
    fn test_aggregate_empty() {
        let snapshot = StatsAggregator::aggregate_in(&[], &Utc, at(10, 12));
        assert_eq!(snapshot.total(), 0);
        assert!(snapshot.by_status().values().all(|c| *c == 0));
        assert!(snapshot.by_risk().values().all(|c| *c == 0));
        assert!(snapshot.by_hour().is_empty());
        assert_eq!(snapshot.avg_processing_time_seconds(), None);
        assert_eq!(snapshot.today_count(), Some(0));
        for status in SubmissionStatus::iter() {
            assert_eq!(snapshot.status_percentage(status), 0.0);
        }
    }

    #[test]
    fn test_aggregate_counts_each_record_once() {
        let records = vec![
            done("a", at(10, 14), Some(RiskLevel::Alto)),
            done("b", at(10, 14), Some(RiskLevel::Medio)),
            done("c", at(10, 9), None),
            with_status("d", at(9, 23), SubmissionStatus::Failed),
            with_status("e", at(10, 9), SubmissionStatus::Queued),
        ];
        let snapshot = StatsAggregator::aggregate_in(&records, &Utc, at(10, 20));

        assert_eq!(snapshot.total(), 5);
        assert_eq!(snapshot.status_count(SubmissionStatus::Done), 3);
        assert_eq!(snapshot.status_count(SubmissionStatus::Failed), 1);
        assert_eq!(snapshot.status_count(SubmissionStatus::Queued), 1);
        assert_eq!(snapshot.risk_count(RiskLevel::Alto), 1);
        assert_eq!(snapshot.risk_count(RiskLevel::Medio), 1);
        // The unclassified result contributes no risk bucket.
        assert_eq!(snapshot.by_risk().values().sum::<u64>(), 2);
        assert_eq!(
            snapshot
                .by_hour_series()
                .iter()
                .map(|b| (b.hour.as_str(), b.count))
                .collect::<Vec<_>>(),
            vec![("9h", 2), ("14h", 2), ("23h", 1)]
        );
        assert_eq!(snapshot.today_count(), Some(4));
        assert_eq!(snapshot.avg_processing_time_seconds(), Some(3.5));
        assert_eq!(snapshot.source(), StatsSource::Derived);
    }

    #[test]
    fn test_hours_follow_the_given_time_zone() {
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let records = vec![done("a", at(10, 1), Some(RiskLevel::Baixo))];
        let snapshot = StatsAggregator::aggregate_in(&records, &sao_paulo, at(10, 12));
        assert_eq!(snapshot.by_hour().get(&22), Some(&1));
        // 01:15 UTC is still the 9th in São Paulo.
        assert_eq!(snapshot.today_count(), Some(0));
    }

    #[test]
    fn test_service_stats_fill_missing_hours_from_records() {
        let stats = ServiceStats {
            total: Some(7),
            by_status: BTreeMap::from([
                (SubmissionStatus::Done, 5),
                (SubmissionStatus::Failed, 1),
            ]),
            by_risk: BTreeMap::from([(RiskLevel::Medio, 5)]),
            by_hour: None,
            avg_processing_time_seconds: Some(6.0),
            today_count: None,
        };
        let mut records: Vec<_> = (0..5)
            .map(|i| done(&format!("d{i}"), at(10, 14), Some(RiskLevel::Medio)))
            .collect();
        records.push(with_status("f", at(9, 23), SubmissionStatus::Failed));
        let snapshot = StatsAggregator::from_service_in(stats, &records, &Utc, at(10, 20));

        assert_eq!(snapshot.source(), StatsSource::Service);
        assert_eq!(snapshot.total(), 6);
        assert_eq!(snapshot.status_count(SubmissionStatus::Queued), 0);
        assert_eq!(snapshot.risk_count(RiskLevel::Medio), 5);
        assert_eq!(snapshot.by_hour().get(&14), Some(&5));
        assert_eq!(snapshot.by_hour().get(&23), Some(&1));
        assert_eq!(snapshot.avg_processing_time_seconds(), Some(6.0));
        assert_eq!(snapshot.today_count(), Some(5));
    }

    fn queued_stats(count: u64) -> ServiceStats {
        ServiceStats {
            total: Some(count),
            by_status: BTreeMap::from([(SubmissionStatus::Queued, count)]),
            ..ServiceStats::default()
        }
    }

    fn queued_records(count: usize) -> Vec<SubmissionRecord> {
        (0..count)
            .map(|i| {
                let hour = (i % 24) as u32;
                with_status(&format!("q{i}"), at(10, hour), SubmissionStatus::Queued)
            })
            .collect()
    }

    #[test]
    fn test_hours_cover_every_counted_submission_beyond_one_page() {
        let records = queued_records(150);
        let snapshot =
            StatsAggregator::from_service_in(queued_stats(150), &records, &Utc, at(10, 20));

        assert_eq!(snapshot.source(), StatsSource::Service);
        assert_eq!(snapshot.total(), 150);
        assert_eq!(snapshot.by_hour().values().sum::<u64>(), 150);
        assert_eq!(snapshot.today_count(), Some(150));
    }

    #[test]
    fn test_partial_listing_yields_a_consistent_derived_snapshot() {
        let records = queued_records(100);
        let snapshot =
            StatsAggregator::from_service_in(queued_stats(150), &records, &Utc, at(10, 20));

        assert_eq!(snapshot.source(), StatsSource::Derived);
        assert_eq!(snapshot.total(), 100);
        assert_eq!(snapshot.by_hour().values().sum::<u64>(), snapshot.total());
        assert_eq!(snapshot.by_status().values().sum::<u64>(), snapshot.total());
    }

    /// Reports `count` queued submissions through a flat `/stats` without
    /// hours and serves them newest first in pages.
    struct PagedCollection {
        records: Vec<SubmissionRecord>,
        pages_served: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisService for PagedCollection {
        async fn submit(&self, _: &SubmitRequest) -> Result<SubmitReceipt, ServiceClientError> {
            unimplemented!()
        }

        async fn get_submission(&self, _: &str) -> Result<SubmissionRecord, ServiceClientError> {
            unimplemented!()
        }

        async fn list_submissions(
            &self,
            query: &ListQuery,
        ) -> Result<SubmissionPage, ServiceClientError> {
            self.pages_served.fetch_add(1, Ordering::SeqCst);
            let start = (query.offset as usize).min(self.records.len());
            let end = (start + query.limit as usize).min(self.records.len());
            Ok(SubmissionPage {
                records: self.records[start..end].to_vec(),
                total: self.records.len() as u64,
            })
        }

        async fn get_stats(&self) -> Result<Option<ServiceStats>, ServiceClientError> {
            Ok(Some(queued_stats(self.records.len() as u64)))
        }

        async fn health(&self) -> Result<HealthReport, ServiceClientError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_snapshot_pages_through_listing_to_complete_service_stats() {
        let service = Arc::new(PagedCollection {
            records: queued_records(150),
            pages_served: AtomicUsize::new(0),
        });
        let snapshot = StatsAggregator::new(service.clone())
            .snapshot()
            .await
            .unwrap();

        assert_eq!(snapshot.source(), StatsSource::Service);
        assert_eq!(snapshot.total(), 150);
        assert_eq!(snapshot.by_hour().values().sum::<u64>(), 150);
        assert_eq!(service.pages_served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_service_and_derived_paths_agree() {
        let records = vec![
            done("a", at(10, 8), Some(RiskLevel::Alto)),
            done("b", at(10, 9), Some(RiskLevel::Baixo)),
            with_status("c", at(10, 9), SubmissionStatus::Processing),
        ];
        let derived = StatsAggregator::aggregate_in(&records, &Utc, at(10, 12));
        let stats = ServiceStats {
            total: Some(3),
            by_status: derived.by_status().clone(),
            by_risk: derived.by_risk().clone(),
            by_hour: Some(derived.by_hour().clone()),
            avg_processing_time_seconds: derived.avg_processing_time_seconds(),
            today_count: derived.today_count(),
        };
        let service = StatsAggregator::from_service_in(stats, &[], &Utc, at(10, 12));

        assert_eq!(service.by_status(), derived.by_status());
        assert_eq!(service.by_risk(), derived.by_risk());
        assert_eq!(service.by_hour_series(), derived.by_hour_series());
        assert_eq!(service.total(), derived.total());
    }

    fn arb_record() -> impl Strategy<Value = SubmissionRecord> {
        (0u32..4, 0u32..3, 1u32..28, 0u32..24).prop_map(|(status, level, day, hour)| {
            let created = at(day, hour);
            let status = SubmissionStatus::iter().nth(status as usize).unwrap();
            if status == SubmissionStatus::Done {
                let level = RiskLevel::iter().nth(level as usize);
                done("p", created, level)
            } else {
                with_status("p", created, status)
            }
        })
    }

    proptest! {
        #[test]
        fn test_aggregate_is_order_independent(
            records in prop::collection::vec(arb_record(), 0..60),
            seed in any::<u64>(),
        ) {
            let now = at(15, 12);
            let forward = StatsAggregator::aggregate_in(&records, &Utc, now);

            let mut shuffled = records.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let pivot = (seed % shuffled.len() as u64) as usize;
                shuffled.rotate_left(pivot);
            }
            let reordered = StatsAggregator::aggregate_in(&shuffled, &Utc, now);

            prop_assert_eq!(forward.by_status(), reordered.by_status());
            prop_assert_eq!(forward.by_risk(), reordered.by_risk());
            prop_assert_eq!(forward.by_hour(), reordered.by_hour());
            prop_assert_eq!(forward.today_count(), reordered.today_count());
        }

        #[test]
        fn test_aggregate_sums_are_consistent(
            records in prop::collection::vec(arb_record(), 0..60),
        ) {
            let snapshot = StatsAggregator::aggregate_in(&records, &Utc, at(15, 12));
            let done_count = records.iter().filter(|r| r.status() == SubmissionStatus::Done).count() as u64;

            prop_assert_eq!(snapshot.total(), records.len() as u64);
            prop_assert_eq!(snapshot.by_status().values().sum::<u64>(), snapshot.total());
            prop_assert_eq!(snapshot.by_hour().values().sum::<u64>(), snapshot.total());
            prop_assert!(snapshot.by_risk().values().sum::<u64>() <= done_count);
            let series = snapshot.by_hour_series();
            let hours: Vec<u32> = series
                .iter()
                .map(|b| b.hour.trim_end_matches('h').parse().unwrap())
                .collect();
            let mut sorted = hours.clone();
            sorted.sort_unstable();
            prop_assert_eq!(hours, sorted);
        }
    }
}
