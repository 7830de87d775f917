// src/logging.rs

//! Log filters and subscribers.
//!
//! The binary logs to stderr: `--log-level` if given, otherwise the
//! `CONSOLE_SCRIPTS_LOG` directives (e.g. `info` or
//! `console_scripts::exec=debug`), otherwise `warn`.
//!
//! In-process script runs get their own thread-scoped subscriber, built by
//! [`capture_dispatch`], that writes into the run's captured stderr.

use anyhow::Result;
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;
use crate::exec::CaptureBuffer;

/// Environment variable holding the binary's log directives.
pub const LOG_ENV: &str = "CONSOLE_SCRIPTS_LOG";

/// Filter used when no directives are given.
pub const DEFAULT_FILTER: &str = "warn";

/// Parse `directives`, falling back to `default` when absent or invalid.
pub fn filter_from(directives: Option<&str>, default: &str) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Initialise the global subscriber for the binary.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(level) => Some(directive(level).to_string()),
        None => std::env::var(LOG_ENV).ok(),
    };

    fmt()
        .with_env_filter(filter_from(directives.as_deref(), DEFAULT_FILTER))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    Ok(())
}

/// Subscriber for one in-process run: plain text into `sink`.
pub(crate) fn capture_dispatch(filter: EnvFilter, sink: &CaptureBuffer) -> Dispatch {
    let sink = sink.clone();
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .finish();
    Dispatch::new(subscriber)
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
