//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (intervals, limits, defaults)
//! - The library [`Config`] and CLI option types

mod constants;
mod types;

pub use constants::*;
pub use types::{Cli, Command, Config, LogFormat, LogLevel};
