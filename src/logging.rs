//! Logging setup built on tracing
//!
//! Events go to stderr so command output stays clean on stdout. When a log
//! directory is configured, a JSON file sink with a non-blocking writer is
//! added; the returned guard must be held for the process lifetime so
//! buffered lines get flushed.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::result::{MmlinkError, Result};

/// Handle for changing the active log filter at runtime
pub type LoggingReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set
    pub file_level: Level,
    /// Directory for log files; `None` disables the file sink
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_level: Level::INFO,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Build configuration from `MMLINK_LOG` and `MMLINK_LOG_DIR`
    pub fn from_env() -> Self {
        let file_level = std::env::var("MMLINK_LOG")
            .ok()
            .and_then(|level| level.parse().ok())
            .unwrap_or(Level::INFO);
        let log_dir = std::env::var("MMLINK_LOG_DIR").ok().map(PathBuf::from);

        Self { file_level, log_dir }
    }
}

/// Initialize the global tracing subscriber
pub fn init_logging(config: LoggingConfig) -> Result<(Option<WorkerGuard>, LoggingReloadHandle)> {
    let default_directives = format!("mmlink={0},mmlink_client={0}", config.file_level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let (filter, reload_handle) = reload::Layer::new(filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mmlink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MmlinkError::general(format!("Failed to initialize logging: {e}")))?;

    Ok((guard, reload_handle))
}
