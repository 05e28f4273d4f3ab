//! Clipboard change detection
//!
//! Cheap pre-filter for poll-based monitoring. Each tick samples the
//! clipboard as a [`ClipboardProbe`] (a text hash, or an image hash when no
//! text is present) and only a changed probe triggers a full capture.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use super::codec::{NativeSnapshot, NativeValue};
use super::image::compute_image_hash;

/// Lightweight sample of the clipboard contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardProbe {
    Empty,
    Text(u64),
    Image(u64),
    /// Neither text nor image; hash over format names
    Other(u64),
}

impl ClipboardProbe {
    pub fn from_snapshot(snapshot: &NativeSnapshot) -> Self {
        if let Some(text) = snapshot.text() {
            return ClipboardProbe::Text(compute_text_hash(text));
        }

        let image = snapshot.iter().find_map(|(_, value)| match value {
            NativeValue::Image(image) => Some(compute_image_hash(image)),
            NativeValue::Png(png) => Some(compute_bytes_hash(png)),
            _ => None,
        });
        if let Some(hash) = image {
            return ClipboardProbe::Image(hash);
        }

        if snapshot.is_empty() {
            return ClipboardProbe::Empty;
        }
        let mut hasher = DefaultHasher::new();
        for (format, _) in snapshot.iter() {
            format.hash(&mut hasher);
        }
        ClipboardProbe::Other(hasher.finish())
    }
}

/// Compute a simple hash of text content for change detection.
pub fn compute_text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn compute_bytes_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Remembers the last probe seen and reports changes against it
#[derive(Debug, Default)]
pub struct ClipboardChangeDetector {
    last_probe: Option<ClipboardProbe>,
}

impl ClipboardChangeDetector {
    pub fn new() -> Self {
        Self { last_probe: None }
    }

    /// Check whether `probe` differs from the previous one and remember it.
    ///
    /// The first call always reports a change so the initial clipboard
    /// state gets captured.
    pub fn has_changed(&mut self, probe: ClipboardProbe) -> bool {
        let changed = self.last_probe != Some(probe);
        if changed {
            debug!(old = ?self.last_probe, new = ?probe, "Clipboard change detected");
        }
        self.last_probe = Some(probe);
        changed
    }

    /// Record `probe` as seen without reporting anything
    pub fn mark_seen(&mut self, probe: ClipboardProbe) {
        self.last_probe = Some(probe);
    }

    /// Next call to `has_changed()` will return true.
    pub fn reset(&mut self) {
        self.last_probe = None;
    }

    #[cfg(test)]
    pub fn last_probe(&self) -> Option<ClipboardProbe> {
        self.last_probe
    }
}
