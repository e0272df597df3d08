use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{AppError, Result};

pub const LOG_FILE_PREFIX: &str = "stepdeckctl.log";

/// Builds the filter: an explicit `--log-level` wins, then `RUST_LOG`, then
/// the configured `logging_level`.
pub fn build_filter(explicit: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let filter = match explicit {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(configured)),
    };
    filter.map_err(|err| AppError::Logging(err.to_string()))
}

/// Installs the global subscriber unless one is already set.
///
/// Diagnostics go to stderr so command output on stdout stays parseable. With
/// `log_dir` a daily rolling file is written too; hold the returned guard
/// until exit.
pub fn init(filter: EnvFilter, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already installed, keeping it");
    }
    Ok(guard)
}
