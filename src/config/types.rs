//! Configuration types and CLI options.
//!
//! This module defines the library [`Config`] (constructible without any CLI
//! dependency) and the `clap` definitions the binary parses into it.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

use crate::config::constants::{
    BASE_URL_ENV_VAR, DEFAULT_BASE_URL, DEFAULT_PAGE_LIMIT, DEFAULT_TIMEOUT_SECS,
    MAX_POLL_ATTEMPTS, POLL_INTERVAL,
};
use crate::error_handling::InitializationError;
use crate::models::SubmissionStatus;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// Resolved once at startup and handed to each component at construction;
/// nothing in the library reads the environment on its own.
///
/// # Examples
///
/// ```no_run
/// use submission_tracker::Config;
///
/// let config = Config::default()
///     .with_base_url("http://analysis.internal:8000")
///     .expect("valid base URL");
/// assert_eq!(config.max_poll_attempts, 30);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote analysis service
    pub base_url: Url,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Fixed delay between two polls of the same job
    pub poll_interval: Duration,

    /// Non-terminal observations tolerated before a poll session times out
    pub max_poll_attempts: u32,

    /// Page size for list views
    pub page_limit: u32,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Port for the optional status server (disabled when `None`)
    pub status_port: Option<u16>,
}

impl Config {
    /// Replaces the service base URL after validating it.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::InvalidBaseUrlError` if the value does not parse
    /// or does not use the `http`/`https` scheme.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, InitializationError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is a valid literal"),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            page_limit: DEFAULT_PAGE_LIMIT,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            status_port: None,
        }
    }
}

/// Parses and validates a service base URL.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, InitializationError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| InitializationError::InvalidBaseUrlError(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(InitializationError::InvalidBaseUrlError(format!(
            "{raw}: unsupported scheme '{other}'"
        ))),
    }
}

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Submit a URL and wait for its analysis
/// submission_tracker submit https://example.com
///
/// # Second page of finished submissions
/// submission_tracker list --status done --page 2
///
/// # Live statistics with a JSON/Prometheus endpoint on :9100
/// submission_tracker watch --stats --status-port 9100
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "submission_tracker",
    about = "Tracks URL risk-analysis submissions and their statistics."
)]
pub struct Cli {
    /// Base URL of the analysis service
    #[arg(long, global = true, env = BASE_URL_ENV_VAR, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands understood by the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a URL for analysis and wait for the result
    Submit {
        /// URL to analyse (must start with http:// or https://)
        url: String,

        /// Opaque user identifier forwarded to the service
        #[arg(long)]
        user_id: Option<String>,

        /// Delay between status checks, in milliseconds
        #[arg(long, default_value_t = POLL_INTERVAL.as_millis() as u64)]
        poll_interval_ms: u64,

        /// Status checks before giving up
        #[arg(long, default_value_t = MAX_POLL_ATTEMPTS)]
        max_attempts: u32,
    },

    /// Show the current state of one submission
    Status {
        /// Job identifier returned at submission time
        job_id: String,
    },

    /// List submissions one page at a time
    List {
        /// Only show submissions in this state (queued|processing|done|failed)
        #[arg(long)]
        status: Option<SubmissionStatus>,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,

        /// Case-insensitive filter on URL or job id, applied to the fetched page
        #[arg(long)]
        search: Option<String>,
    },

    /// Print status, risk and hour-of-day distributions
    Stats,

    /// Print statistics together with the most recent submissions
    Dashboard,

    /// Keep refreshing a view until interrupted
    Watch {
        /// Refresh statistics (10s cadence) instead of the live list (5s cadence)
        #[arg(long)]
        stats: bool,

        /// Serve the latest snapshot on this port (`/stats`, `/metrics`)
        #[arg(long)]
        status_port: Option<u16>,
    },

    /// Check that the analysis service is reachable
    Health,
}

impl Cli {
    /// Builds the library configuration from parsed options.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::InvalidBaseUrlError` for an unusable base URL.
    pub fn to_config(&self) -> Result<Config, InitializationError> {
        let mut config = Config {
            timeout_seconds: self.timeout_seconds,
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            ..Config::default()
        }
        .with_base_url(&self.base_url)?;

        match &self.command {
            Command::Submit {
                poll_interval_ms,
                max_attempts,
                ..
            } => {
                config.poll_interval = Duration::from_millis(*poll_interval_ms);
                config.max_poll_attempts = *max_attempts;
            }
            Command::List { limit, .. } => config.page_limit = *limit,
            Command::Watch { status_port, .. } => config.status_port = *status_port,
            _ => {}
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.max_poll_attempts, 30);
        assert_eq!(config.page_limit, 20);
        assert_eq!(config.timeout_seconds, 10);
        assert!(config.status_port.is_none());
    }

    #[test]
    fn test_with_base_url_rejects_other_schemes() {
        let result = Config::default().with_base_url("ftp://example.com");
        assert!(matches!(
            result,
            Err(InitializationError::InvalidBaseUrlError(_))
        ));
    }

    #[test]
    fn test_with_base_url_rejects_garbage() {
        assert!(Config::default().with_base_url("not a url").is_err());
    }

    #[test]
    fn test_cli_submit_overrides_polling() {
        let cli = Cli::try_parse_from([
            "submission_tracker",
            "--base-url",
            "https://api.example.com",
            "submit",
            "https://suspicious.example",
            "--poll-interval-ms",
            "500",
            "--max-attempts",
            "4",
        ])
        .expect("arguments should parse");

        let config = cli.to_config().expect("config should build");
        assert_eq!(config.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_poll_attempts, 4);
    }

    #[test]
    fn test_cli_list_parses_status_filter() {
        let cli = Cli::try_parse_from([
            "submission_tracker",
            "list",
            "--status",
            "processing",
            "--page",
            "3",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::List { status, page, .. } => {
                assert_eq!(status, Some(SubmissionStatus::Processing));
                assert_eq!(page, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_list_rejects_unknown_status() {
        let result = Cli::try_parse_from(["submission_tracker", "list", "--status", "archived"]);
        assert!(result.is_err());
    }
}
