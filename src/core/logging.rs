//! Diagnostic logging on stderr
//!
//! Stdout belongs to the cached command, so every log line goes to stderr and
//! the default level keeps normal runs silent.

use std::io;

use anyhow::{anyhow, Result};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "CCLO_LOG";

/// Level used when neither `--log-level` nor `CCLO_LOG` is set
pub const DEFAULT_LEVEL: &str = "warn";

/// Log level options for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Build the filter: an explicit level wins, then `CCLO_LOG`, then the default
fn build_filter(level: Option<LogLevel>) -> Result<EnvFilter> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(format!("cclo={}", level.as_directive())),
        None => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(format!("cclo={}", DEFAULT_LEVEL))),
    };
    filter.map_err(|e| anyhow!("Failed to create log filter: {}", e))
}

/// Install the global subscriber
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(build_filter(level)?)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
