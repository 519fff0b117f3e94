//! Terminal rendering of records, pages and statistics.
//!
//! Every function returns the text instead of printing it, so the command
//! layer decides where output goes.

use std::fmt::Write;

use chrono::Local;
use colored::*;
use strum::IntoEnumIterator;

use crate::models::{RiskLevel, StatsSnapshot, StatsSource, SubmissionRecord, SubmissionStatus};
use crate::poller::PollOutcome;
use crate::service::{HealthReport, SubmissionPage};
use crate::stats::Dashboard;
use crate::store::{page_count, PageRequest};

const BAR_WIDTH: usize = 30;

fn status_label(status: SubmissionStatus) -> ColoredString {
    match status {
        SubmissionStatus::Queued => status.as_str().yellow(),
        SubmissionStatus::Processing => status.as_str().blue(),
        SubmissionStatus::Done => status.as_str().green(),
        SubmissionStatus::Failed => status.as_str().red(),
    }
}

fn risk_label(level: RiskLevel) -> ColoredString {
    match level {
        RiskLevel::Alto => level.as_str().red().bold(),
        RiskLevel::Medio => level.as_str().yellow().bold(),
        RiskLevel::Baixo => level.as_str().green().bold(),
    }
}

fn short_time(record: &SubmissionRecord) -> String {
    record
        .created_at()
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Full view of one submission, including checks and tips when done.
pub fn render_record(record: &SubmissionRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "URL:".bold(), record.url());
    let _ = writeln!(out, "{} {}", "Job:".bold(), record.job_id());
    let _ = writeln!(out, "{} {}", "Status:".bold(), status_label(record.status()));
    let _ = writeln!(out, "{} {}", "Submitted:".bold(), short_time(record));
    if let Some(seconds) = record.processing_seconds() {
        let _ = writeln!(out, "{} {seconds:.1}s", "Processing time:".bold());
    }
    if let Some(message) = record.error_message() {
        let _ = writeln!(out, "{} {}", "Error:".bold(), message.red());
    }

    if let Some(result) = record.result() {
        let level = result
            .level
            .map(|level| risk_label(level).to_string())
            .unwrap_or_else(|| "unclassified".dimmed().to_string());
        let _ = writeln!(out, "{} {level} (score {}/100)", "Risk:".bold(), result.score);

        if !result.checks.is_empty() {
            let _ = writeln!(out, "{}", "Checks:".bold());
            for check in &result.checks {
                let mark = if check.ok { "✔".green() } else { "✘".red() };
                if check.reason.is_empty() {
                    let _ = writeln!(out, "  {mark} {}", check.name);
                } else {
                    let _ = writeln!(out, "  {mark} {}: {}", check.name, check.reason);
                }
            }
        }
        if !result.tips.is_empty() {
            let _ = writeln!(out, "{}", "Tips:".bold());
            for tip in &result.tips {
                let _ = writeln!(out, "  • {tip}");
            }
        }
    }
    out
}

/// One line per record: time, status, risk and URL.
fn render_row(record: &SubmissionRecord) -> String {
    let risk = record
        .result()
        .and_then(|result| result.level)
        .map(|level| risk_label(level).to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {:<10}  {:<6}  {}  {}",
        short_time(record),
        status_label(record.status()),
        risk,
        record.job_id().dimmed(),
        record.url()
    )
}

/// Terminal outcome of a tracked submission.
pub fn render_outcome(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Resolved(record) => render_record(record),
        other => format!("{}\n", other.user_message().red()),
    }
}

/// A page of submissions with its position in the listing.
///
/// `visible` is the subset to show (after a local search), `page` what was
/// fetched.
pub fn render_page(
    page: &SubmissionPage,
    visible: &[&SubmissionRecord],
    request: PageRequest,
) -> String {
    let mut out = String::new();
    let pages = page_count(page.total, request.limit());
    if request.is_past_end(page.total) {
        let _ = writeln!(
            out,
            "{}",
            format!("Page {} is past the last page ({pages}).", request.page()).yellow()
        );
    } else if visible.is_empty() {
        let _ = writeln!(out, "{}", "No submissions.".dimmed());
    }
    for record in visible {
        let _ = writeln!(out, "{}", render_row(record));
    }
    let _ = writeln!(
        out,
        "{}",
        format!(
            "Page {} of {} ({} submissions, showing {})",
            request.page(),
            pages.max(1),
            page.total,
            visible.len()
        )
        .dimmed()
    );
    out
}

fn bar(share: f64) -> String {
    let filled = ((share / 100.0) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.min(BAR_WIDTH))
}

/// Status, risk and hour-of-day distributions.
pub fn render_snapshot(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();
    let source = match snapshot.source() {
        StatsSource::Service => "reported by service",
        StatsSource::Derived => "derived from recent submissions",
    };
    let _ = writeln!(
        out,
        "{} {} ({})",
        "Total submissions:".bold(),
        snapshot.total(),
        source.dimmed()
    );
    if let Some(today) = snapshot.today_count() {
        let _ = writeln!(out, "{} {today}", "Today:".bold());
    }
    if let Some(avg) = snapshot.avg_processing_time_seconds() {
        let _ = writeln!(out, "{} {avg:.1}s", "Average processing time:".bold());
    }

    let _ = writeln!(out, "\n{}", "By status".bold().underline());
    for status in SubmissionStatus::iter() {
        let share = snapshot.status_percentage(status);
        let _ = writeln!(
            out,
            "  {:<10} {:>5} {:>5.1}% {}",
            status_label(status),
            snapshot.status_count(status),
            share,
            bar(share)
        );
    }

    let _ = writeln!(out, "\n{}", "By risk".bold().underline());
    for level in RiskLevel::iter().rev() {
        let share = snapshot.risk_percentage(level);
        let _ = writeln!(
            out,
            "  {:<10} {:>5} {:>5.1}% {}",
            risk_label(level),
            snapshot.risk_count(level),
            share,
            bar(share)
        );
    }

    let series = snapshot.by_hour_series();
    if !series.is_empty() {
        let _ = writeln!(out, "\n{}", "By hour".bold().underline());
        let peak = series.iter().map(|b| b.count).max().unwrap_or(0);
        for bucket in &series {
            let share = if peak == 0 {
                0.0
            } else {
                bucket.count as f64 / peak as f64 * 100.0
            };
            let _ = writeln!(out, "  {:>4} {:>5} {}", bucket.hour, bucket.count, bar(share));
        }
    }
    out
}

/// Statistics followed by the most recent submissions.
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = render_snapshot(&dashboard.snapshot);
    let _ = writeln!(out, "\n{}", "Recent submissions".bold().underline());
    if dashboard.recent.is_empty() {
        let _ = writeln!(out, "{}", "No submissions yet.".dimmed());
    }
    for record in &dashboard.recent {
        let _ = writeln!(out, "{}", render_row(record));
    }
    out
}

/// Service health summary.
pub fn render_health(report: &HealthReport) -> String {
    let mut out = String::new();
    let status = if report.is_ok() {
        report.status.green().bold()
    } else {
        report.status.red().bold()
    };
    let _ = writeln!(out, "{} {status}", "Service:".bold());
    if let Some(timestamp) = &report.timestamp {
        let _ = writeln!(out, "{} {timestamp}", "Checked at:".bold());
    }
    for (name, value) in &report.services {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "  {name}: {value}");
    }
    out
}
