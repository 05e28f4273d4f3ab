//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Default location of the config file
pub const DEFAULT_CONFIG_PATH: &str = "~/.clipstack/config.json";

/// Default directory for the history and settings files
pub const DEFAULT_DATA_DIR: &str = "~/.clipstack";

/// Default history cap. Oldest non-favorite entries are evicted beyond it.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Default max text length for a captured text format (bytes)
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100_000;

/// Default clipboard poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default bounded retry for clipboard reads
pub const DEFAULT_READ_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_READ_RETRY_BACKOFF_MS: u64 = 25;

/// Default bounded retry for clipboard writes
pub const DEFAULT_WRITE_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_WRITE_RETRY_BACKOFF_MS: u64 = 25;

/// Default wait between hiding the presenter and sending the paste keystroke
pub const DEFAULT_PASTE_SETTLE_DELAY_MS: u64 = 100;

/// Capture whatever is on the clipboard when the engine starts
pub const DEFAULT_CAPTURE_ON_START: bool = true;
