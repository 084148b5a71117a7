use std::path::Path;

use error_stack::{Report, ResultExt};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::error::{Error, Result};

/// Filter directive used when `--log-level` is not given
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Parse an `EnvFilter` directive such as `debug` or `protobridge=trace,warn`
pub(crate) fn env_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|error| Report::new(Error::invalid("log level", error)))
        .attach(format!("directive: {directive}"))
}

/// Install the global subscriber: stderr always, plus a non-blocking writer to `log_file`
/// Returns a `WorkerGuard` that must be kept alive for file logging to work
pub(crate) fn init_tracing(
    directive: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(directive)?;
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let Some(file_name) = path.file_name() else {
                return Err(Report::new(Error::invalid(
                    "log file",
                    format!("{} has no file name", path.display()),
                )));
            };
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(file_layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| Report::new(Error::invalid("tracing subscriber", error)))?;

    Ok(guard)
}
