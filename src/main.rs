//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `submission_tracker` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use submission_tracker::initialization::init_logger_with;
use submission_tracker::{run_command, Cli};

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = cli.to_config()?;
    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;
    run_command(&cli.command, &config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file (if it exists)
    // so SUBMISSION_TRACKER_API_URL can live there instead of the shell.
    // Try the current directory first, then the executable's directory.
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("submission_tracker error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
