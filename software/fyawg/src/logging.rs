//! Terminal and file logging for driver sessions.
//!
//! Drivers emit `tracing` events; nothing is printed until a subscriber is
//! installed, either by the caller or with `init_logging`.

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::OnceLock,
};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DriverConfig;
use crate::error::AwgError;

/// Global root logger.
static LOGGING: OnceLock<Logging> = OnceLock::new();

/// Logger thread handles, which must be kept alive for as long as the logging targets will be used.
/// Flushed automatically when dropped.
struct Logging {
    _stdout: WorkerGuard,
    _file: Option<WorkerGuard>,
    path: Option<PathBuf>,
}

/// Log file name for a session of `config`'s driver started at `started`,
/// e.g. `fy3200s_dev_ttyUSB0_2024-05-01T120000Z.log`.
pub fn log_file_name(config: &DriverConfig, started: DateTime<Utc>) -> String {
    let port: String = config
        .port
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let port = port.trim_matches('_');
    let time = started
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(':', "");

    format!("{}_{port}_{time}.log", config.driver)
}

/// Set up terminal logging, plus file logging to `<log_dir>/logs/` if the
/// config names a `log_dir`.
///
/// The level filter is read from `RUST_LOG` and defaults to `info`.
/// Only the first call installs a logger; later calls return the file
/// chosen by the first. Returns the path of the log file, if any.
pub fn init_logging(config: &DriverConfig) -> Result<Option<PathBuf>, AwgError> {
    if let Some(logging) = LOGGING.get() {
        return Ok(logging.path.clone());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| AwgError::Logging(format!("failed to set up env filter: {e}")))?;

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_writer(stdout_writer)
        .with_target(false);

    // Build file writer
    let (file_layer, file_guard, path) = match &config.log_dir {
        Some(dir) => {
            let log_dir = dir.join("logs");
            fs::create_dir_all(&log_dir)
                .map_err(|e| AwgError::Logging(format!("failed to create log directory: {e}")))?;
            let path = log_dir.join(log_file_name(config, Utc::now()));
            let logfile = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| AwgError::Logging(format!("failed to create log file: {e}")))?;

            let (file_writer, file_guard) = tracing_appender::non_blocking(logfile);
            let file_layer = fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(file_writer)
                .with_ansi(false);
            (Some(file_layer), Some(file_guard), Some(path))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AwgError::Logging(format!("failed to initialize: {e}")))?;

    let logging = LOGGING.get_or_init(|| Logging {
        _stdout: stdout_guard,
        _file: file_guard,
        path,
    });

    if let Some(path) = &logging.path {
        info!("Logging `{}` session on `{}` to {path:?}", config.driver, config.port);
    }

    Ok(logging.path.clone())
}
