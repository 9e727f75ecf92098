//! Logging setup for Slideshow Manager
//!
//! Installs a console layer on stderr plus an optional plain-text layer
//! appending to a log file, both behind one `EnvFilter`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log file name, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "slideshow_manager.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install logger: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Level directive for a `-v` count.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Filter from `RUST_LOG` when set, otherwise from the verbosity.
pub fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)))
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already installed.
pub fn init_logging(log_file: Option<&Path>, verbosity: u8) -> Result<(), LoggingError> {
    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(verbosity))
        .with(fmt::layer().with_target(false).compact().with_writer(io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(())
}
