//! Debug logging support for optpatch
//!
//! When debug mode is enabled via config or `--debug`, operations are logged
//! to ~/.optpatch/optpatch.log. Nothing is logged otherwise.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

const LOG_FILE_NAME: &str = "optpatch.log";

/// Initialize the debug logging system
///
/// Returns the path to the log file, or None if logging is not enabled.
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_debug_logging(debug_enabled: bool, level: &str) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    let log_dir = crate::config::config_dir()?;

    // A broken log location must never stop the patch from running
    let appender = match open_appender(&log_dir) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {:#}", e);
            return Ok(None);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(Some(log_dir.join(LOG_FILE_NAME)))
}

fn open_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)
        .map_err(|e| anyhow::anyhow!(crate::error_helpers::dir_create_error(log_dir, &e)))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open log file in {}: {}", log_dir.display(), e))
}

fn default_directive(level: &str) -> String {
    format!("optpatch={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_debug_logging_disabled() {
        let result = init_debug_logging(false, "info");
        assert_eq!(result.unwrap(), None, "Should return None when debug is disabled");
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("debug"), "optpatch=debug");
    }

    #[test]
    fn test_open_appender_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");

        open_appender(&log_dir).unwrap();
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }
}
