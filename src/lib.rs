//! submission_tracker library: tracking URL risk-analysis jobs
//!
//! This library submits URLs to a remote analysis service, polls each job
//! until it finishes, pages through past submissions and aggregates them into
//! dashboard statistics (status, risk level and hour-of-day distributions).
//!
//! # Example
//!
//! ```no_run
//! use submission_tracker::initialization::init_service;
//! use submission_tracker::{submit_and_track, Config, PollOutcome, ResultPoller};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default().with_base_url("http://localhost:8000")?;
//! let service = init_service(&config)?;
//! let poller = ResultPoller::new(service, &config);
//!
//! let tracked = submit_and_track(&poller, "https://example.com", None).await?;
//! match tracked.outcome {
//!     PollOutcome::Resolved(record) => println!("{} is done", record.url()),
//!     other => println!("{}", other.user_message()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Poll sessions and auto-refresh loops
//! are spawned onto the current runtime.

#![warn(missing_docs)]

mod app;
pub mod config;
mod error_handling;
pub mod initialization;
mod models;
mod poller;
mod run;
mod service;
mod stats;
mod status_server;
mod store;

// Re-export public API
pub use app::validate_submission_url;
pub use config::{Cli, Command, Config, LogFormat, LogLevel};
pub use error_handling::{
    ErrorKind, InitializationError, RefreshStats, ServiceClientError, TrackerError,
};
pub use models::{
    AnalysisResult, Check, HourBucket, Lifecycle, RiskLevel, ServiceStats, StatsSnapshot,
    StatsSource, SubmissionRecord, SubmissionStatus, UnknownRiskLevel,
};
pub use poller::{
    PollCallbacks, PollFailure, PollOutcome, PollSession, PollState, ResultPoller, Scheduler,
    TokioScheduler,
};
pub use run::{run_command, submit, submit_and_track, TrackedSubmission};
pub use service::{
    AnalysisService, HealthReport, HttpAnalysisService, ListQuery, SubmissionPage, SubmitReceipt,
    SubmitRequest,
};
pub use stats::{Dashboard, StatsAggregator};
pub use status_server::{start_status_server, StatusState};
pub use store::{page_count, search, AutoRefreshHandle, PageRequest, Refresh, SubmissionStore};
