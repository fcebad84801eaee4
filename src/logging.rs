//! Tracing subscriber setup shared by both binaries
//!
//! Logs always go to stderr (or the configured file) so stdout stays free
//! for results. `RUST_LOG` wins over the configured level.

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::Format(other.to_string())),
        }
    }
}

/// Errors that can occur while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log format: {0} (expected pretty or json)")]
    Format(String),

    #[error("Cannot open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging already initialized: {0}")]
    Init(String),
}

/// Install the global subscriber
///
/// `verbose` raises the crate's own level to debug when `RUST_LOG` is unset.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<(), LoggingError> {
    let format: LogFormat = config.format.parse()?;
    let filter = build_env_filter(&config.level, verbose);

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::IsTerminal::is_terminal(&std::io::stderr()),
        ),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(writer).with_ansi(ansi).with_target(false))
            .try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}

/// `RUST_LOG` if set and valid, otherwise `boardsift=<level>`
fn build_env_filter(level: &str, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if verbose { "debug" } else { level };
    EnvFilter::try_new(format!("boardsift={},tower_http=info", level))
        .unwrap_or_else(|_| EnvFilter::new("boardsift=info"))
}
