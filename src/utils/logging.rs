//! Logging initialization for Picobot.
//!
//! Supports three formats:
//! - `compact`: single-line `LEVEL target: message fields`, the default
//! - `pretty`: multi-line human-readable output
//! - `json`: structured JSON lines for log aggregators
//!
//! Use the [`log_component!`] macro to tag events with a `component` field.

use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{PicoError, Result};

/// Initialize the global tracing subscriber from config.
///
/// `RUST_LOG` takes precedence over `cfg.level`. Output goes to stderr unless
/// `cfg.file` names a file to append to.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let (writer, ansi) = match &cfg.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| PicoError::Config(format!("failed to open log file {}: {}", path, e)))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    let result = match cfg.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| PicoError::Config(format!("failed to initialize logging: {}", e)))
}

/// Emit a component-tagged tracing event.
///
/// ```
/// # use picobot::log_component;
/// log_component!(info, "cron", "job fired");
/// log_component!(warn, "bus", "outbound full", dropped = 1u64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
