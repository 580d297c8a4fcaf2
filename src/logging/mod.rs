//! Tracing setup for the CLI: a rolling log file plus console output on
//! stderr, so rendered documents and reports on stdout stay clean.

mod init;

pub use init::{init_logging, parse_rotation};

use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_appender::rolling::Rotation;

/// Log filename inside the log directory.
pub const LOG_FILENAME: &str = "tf-exporter.log";

/// Target the default filter enables.
pub const LOG_TARGET: &str = "tf_exporter";

static LOG_FILE_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Remember where logs go, for error messages printed later.
pub fn set_log_file_path(path: PathBuf) {
    let _ = LOG_FILE_PATH.set(path);
}

#[must_use]
pub fn log_file_path() -> Option<&'static PathBuf> {
    LOG_FILE_PATH.get()
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    /// Level used when `RUST_LOG` is not set.
    pub log_level: Level,
    pub json_format: bool,
    pub rotation: Rotation,
}

impl LogConfig {
    /// `~/.tf-exporter/logs`, or `./.tf-exporter/logs` without a home directory.
    #[must_use]
    pub fn default_log_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tf-exporter")
            .join("logs")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: Self::default_log_dir(),
            log_level: Level::INFO,
            json_format: false,
            rotation: Rotation::DAILY,
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
