//! Command execution.
//!
//! Turns a parsed [`Command`] into calls on the tracking API and renders the
//! results for the terminal.

mod commands;
mod submit;
mod watch;

use std::process::ExitCode;

use anyhow::Result;

use crate::config::{Command, Config};
use crate::initialization::init_service;

pub use submit::{submit, submit_and_track, TrackedSubmission};

/// Exit status when the analysis itself failed.
pub(crate) const EXIT_JOB_FAILED: u8 = 2;
/// Exit status when polling gave up before a terminal state.
pub(crate) const EXIT_TIMED_OUT: u8 = 3;

/// Runs one CLI command against the configured service.
///
/// # Errors
///
/// Returns an error if the service client cannot be built, or if the command
/// fails in a way that leaves nothing useful to print.
pub async fn run_command(command: &Command, config: &Config) -> Result<ExitCode> {
    let service = init_service(config)?;

    match command {
        Command::Submit { url, user_id, .. } => {
            commands::submit(service, config, url, user_id.as_deref()).await
        }
        Command::Status { job_id } => commands::status(service, job_id).await,
        Command::List {
            status,
            page,
            limit,
            search,
            ..
        } => commands::list(service, *status, *page, *limit, search.as_deref()).await,
        Command::Stats => commands::stats(service).await,
        Command::Dashboard => commands::dashboard(service).await,
        Command::Watch { stats, .. } => watch::watch(service, config, *stats).await,
        Command::Health => commands::health(service).await,
    }
}
