//! Configuration type definitions
//!
//! This module contains all the struct definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

// ============================================
// HISTORY CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of entries kept (default: 500). `null` or 0 = unbounded.
    #[serde(default = "default_max_entries")]
    pub max_entries: Option<usize>,
    /// Maximum text length captured per format, in bytes (default: 100000). 0 = no limit.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

fn default_max_entries() -> Option<usize> {
    Some(DEFAULT_MAX_ENTRIES)
}
fn default_max_text_length() -> usize {
    DEFAULT_MAX_TEXT_LENGTH
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }
}

impl HistoryConfig {
    /// Entry cap with 0 normalized to unbounded
    pub fn effective_max_entries(&self) -> Option<usize> {
        self.max_entries.filter(|&n| n > 0)
    }

    /// Text length limit with 0 normalized to no limit
    pub fn effective_max_text_length(&self) -> usize {
        match self.max_text_length {
            0 => usize::MAX,
            n => n,
        }
    }
}

// ============================================
// MONITOR CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Interval between clipboard polls in milliseconds (default: 500)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Read attempts before a capture is skipped (default: 4)
    #[serde(default = "default_read_retry_attempts")]
    pub read_retry_attempts: u32,
    /// Sleep between read attempts in milliseconds (default: 25)
    #[serde(default = "default_read_retry_backoff_ms")]
    pub read_retry_backoff_ms: u64,
    /// Capture the current clipboard when the engine starts (default: true)
    #[serde(default = "default_capture_on_start")]
    pub capture_on_start: bool,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_read_retry_attempts() -> u32 {
    DEFAULT_READ_RETRY_ATTEMPTS
}
fn default_read_retry_backoff_ms() -> u64 {
    DEFAULT_READ_RETRY_BACKOFF_MS
}
fn default_capture_on_start() -> bool {
    DEFAULT_CAPTURE_ON_START
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_retry_attempts: DEFAULT_READ_RETRY_ATTEMPTS,
            read_retry_backoff_ms: DEFAULT_READ_RETRY_BACKOFF_MS,
            capture_on_start: DEFAULT_CAPTURE_ON_START,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn read_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.read_retry_backoff_ms)
    }
}

// ============================================
// PLAYBACK CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Write attempts before copy/paste reports failure (default: 4)
    #[serde(default = "default_write_retry_attempts")]
    pub write_retry_attempts: u32,
    /// Sleep between write attempts in milliseconds (default: 25)
    #[serde(default = "default_write_retry_backoff_ms")]
    pub write_retry_backoff_ms: u64,
    /// Wait before the paste keystroke in milliseconds (default: 100)
    #[serde(default = "default_paste_settle_delay_ms")]
    pub paste_settle_delay_ms: u64,
}

fn default_write_retry_attempts() -> u32 {
    DEFAULT_WRITE_RETRY_ATTEMPTS
}
fn default_write_retry_backoff_ms() -> u64 {
    DEFAULT_WRITE_RETRY_BACKOFF_MS
}
fn default_paste_settle_delay_ms() -> u64 {
    DEFAULT_PASTE_SETTLE_DELAY_MS
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            write_retry_attempts: DEFAULT_WRITE_RETRY_ATTEMPTS,
            write_retry_backoff_ms: DEFAULT_WRITE_RETRY_BACKOFF_MS,
            paste_settle_delay_ms: DEFAULT_PASTE_SETTLE_DELAY_MS,
        }
    }
}

impl PlaybackConfig {
    pub fn write_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.write_retry_backoff_ms)
    }

    pub fn paste_settle_delay(&self) -> Duration {
        Duration::from_millis(self.paste_settle_delay_ms)
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding history.dat and settings.dat (default: ~/.clipstack)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<PlaybackConfig>,
}

impl Config {
    /// Returns the data directory with `~` expanded
    pub fn get_data_dir(&self) -> PathBuf {
        let raw = self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR);
        PathBuf::from(shellexpand::tilde(raw).as_ref())
    }

    /// Returns the history configuration, or defaults if not configured
    pub fn get_history(&self) -> HistoryConfig {
        self.history.clone().unwrap_or_default()
    }

    /// Returns the monitor configuration, or defaults if not configured
    pub fn get_monitor(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }

    /// Returns the playback configuration, or defaults if not configured
    pub fn get_playback(&self) -> PlaybackConfig {
        self.playback.clone().unwrap_or_default()
    }
}
