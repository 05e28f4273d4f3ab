//! Structured JSONL logging plus human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.clipstack/logs/clipstack.jsonl) - structured for tooling
//! - **Compact to stderr** - human-readable for developers
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipstack::logging;
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init();
//!
//! // Use tracing macros directly
//! tracing::info!(entry_id = %id, "Captured clipboard entry");
//! ```
//!
//! # JSONL Output Format
//!
//! Each line is a valid JSON object:
//! ```json
//! {"timestamp":"2026-01-05T10:30:45.123Z","level":"INFO","target":"clipstack::clipboard_history::engine","fields":{"message":"Captured clipboard entry","entry_id":"..."}}
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "clipstack.jsonl";

/// Default filter when RUST_LOG is not set
pub const DEFAULT_FILTER: &str = "info";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging into the default log directory with the default filter.
pub fn init() -> LoggingGuard {
    init_with(&get_log_dir(), DEFAULT_FILTER)
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// If the log file cannot be opened, file output is discarded and stderr
/// logging still works.
pub fn init_with(log_dir: &Path, default_filter: &str) -> LoggingGuard {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_dir.join(LOG_FILE_NAME);

    // Non-blocking writer so the engine thread never waits on disk
    let (non_blocking_file, file_guard) = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            tracing_appender::non_blocking(std::io::sink())
        }
    };

    // Default filter unless overridden via RUST_LOG
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    // try_init: a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init();

    tracing::debug!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the log directory path (~/.clipstack/logs/)
fn get_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".clipstack").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("clipstack-logs"))
}

/// Get the path to the JSONL log file
pub fn log_path() -> PathBuf {
    get_log_dir().join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_is_jsonl_under_clipstack() {
        let path = log_path();
        assert!(path.to_string_lossy().ends_with("clipstack.jsonl"));
    }

    #[test]
    fn test_init_with_creates_log_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let guard = init_with(&log_dir, "debug");
        tracing::info!("test line");
        drop(guard);
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }
}
