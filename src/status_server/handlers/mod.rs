//! Status server HTTP handlers.

mod metrics;
mod stats;

pub use metrics::metrics_handler;
pub use stats::stats_handler;
