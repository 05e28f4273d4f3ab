//! Configuration module - Engine settings and limits
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.clipstack/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, HistoryConfig, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

// Re-export defaults that are used externally
pub use defaults::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_TEXT_LENGTH, DEFAULT_POLL_INTERVAL_MS};

// Re-export types that are used externally
pub use types::{Config, HistoryConfig, MonitorConfig, PlaybackConfig};

// Re-export loader
pub use loader::{default_config_path, load_config, load_config_from};

// Additional exports for tests
#[cfg(test)]
pub use defaults::{
    DEFAULT_DATA_DIR, DEFAULT_PASTE_SETTLE_DELAY_MS, DEFAULT_READ_RETRY_ATTEMPTS,
    DEFAULT_READ_RETRY_BACKOFF_MS, DEFAULT_WRITE_RETRY_ATTEMPTS,
};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
