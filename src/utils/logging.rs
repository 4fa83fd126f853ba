//! Diagnostic logging to a file.
//!
//! The terminal is in raw mode while the chat runs, so nothing may be written
//! to stdout or stderr. Tracing output goes to the file passed with `--log`;
//! without it no subscriber is installed.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_FILTER_ENV: &str = "MULTICHAT_LOG";
pub const DEFAULT_LOG_FILTER: &str = "multichat=info";

pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Picks the filter directive, ignoring blank overrides.
pub fn filter_directive(env_value: Option<String>) -> String {
    env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn init_logging(log_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let Some(path) = log_path else {
        return Ok(());
    };

    let file = open_log_file(path)
        .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
    let directive = filter_directive(std::env::var(LOG_FILTER_ENV).ok());

    tracing_subscriber::registry()
        .with(build_filter(&directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}
