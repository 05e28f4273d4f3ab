use thiserror::Error;
use tracing::{error, warn};

/// Error severity for user-facing display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable, user can retry or act manually
    Error,    // operation failed
    Critical, // engine unusable
}

/// Errors surfaced to the presentation layer by explicit actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardHistoryError {
    #[error("Clipboard stayed busy after {attempts} attempts")]
    ClipboardBusy { attempts: u32 },

    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Entry has no format that can be written to the clipboard")]
    NothingToWrite,

    #[error("No clipboard entry with id '{0}'")]
    EntryNotFound(String),

    #[error("Paste keystroke failed: {0}")]
    KeystrokeInjection(String),

    #[error("Clipboard engine is not running")]
    EngineStopped,
}

impl ClipboardHistoryError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ClipboardBusy { .. } => ErrorSeverity::Warning,
            Self::ClipboardUnavailable(_) => ErrorSeverity::Error,
            Self::NothingToWrite => ErrorSeverity::Warning,
            Self::EntryNotFound(_) => ErrorSeverity::Info,
            Self::KeystrokeInjection(_) => ErrorSeverity::Warning,
            Self::EngineStopped => ErrorSeverity::Critical,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::ClipboardBusy { .. } => {
                "Another application is using the clipboard. Try again.".to_string()
            }
            Self::ClipboardUnavailable(msg) => format!("Could not access the clipboard: {}", msg),
            Self::NothingToWrite => "This entry can no longer be placed on the clipboard".to_string(),
            Self::EntryNotFound(_) => "That clipboard entry no longer exists".to_string(),
            Self::KeystrokeInjection(_) => {
                "Copied to clipboard, but automatic paste failed. Paste manually.".to_string()
            }
            Self::EngineStopped => "Clipboard history is not running".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipboardHistoryError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use clipstack::error::ResultExt;
///
/// let config = std::fs::read_to_string(path).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
