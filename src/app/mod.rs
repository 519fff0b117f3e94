//! Main application modules.
//!
//! This module provides URL validation for submissions and the terminal
//! rendering used by the CLI commands.

pub mod report;
pub mod url;

// Re-export public API
pub use report::{
    render_dashboard, render_health, render_outcome, render_page, render_record, render_snapshot,
};
pub use url::validate_submission_url;
