//! Clipboard monitoring
//!
//! Turns OS clipboard-change notifications (push) or timer ticks (poll) into
//! at most one capture per external clipboard write. The monitor owns the
//! suppression flag the playback controller sets before writing, so the
//! engine's own writes never come back as new history entries.

use tracing::{debug, trace};

use super::backend::ClipboardBackend;
use super::change_detection::{ClipboardChangeDetector, ClipboardProbe};
use super::codec::{NativeSnapshot, PayloadCodec};
use super::history::HistoryStore;
use super::retry::RetryPolicy;
use super::types::Entry;

/// How clipboard changes reach the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    /// The host delivers one notification per clipboard write
    Push,
    /// A timer samples the clipboard at a fixed interval
    Poll,
}

/// What happened to one notification or tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Our own write; the flag was consumed
    Suppressed,
    /// Poll tick saw the same clipboard as last time
    Unchanged,
    /// Nothing capturable on the clipboard
    Empty,
    /// Captured content matched the history head
    Duplicate,
    Inserted(String),
    /// Clipboard stayed unreadable through every retry
    ReadFailed,
}

impl CaptureOutcome {
    pub fn inserted_id(&self) -> Option<&str> {
        match self {
            CaptureOutcome::Inserted(id) => Some(id),
            _ => None,
        }
    }
}

pub struct ChangeMonitor {
    mode: MonitorMode,
    suppress_next_capture: bool,
    last_captured_text: Option<String>,
    detector: ClipboardChangeDetector,
    read_policy: RetryPolicy,
    codec: PayloadCodec,
}

impl ChangeMonitor {
    pub fn new(mode: MonitorMode, read_policy: RetryPolicy, codec: PayloadCodec) -> Self {
        Self {
            mode,
            suppress_next_capture: false,
            last_captured_text: None,
            detector: ClipboardChangeDetector::new(),
            read_policy,
            codec,
        }
    }

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    /// Ignore the next observed clipboard change
    pub fn suppress_next_capture(&mut self) {
        self.suppress_next_capture = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress_next_capture
    }

    pub fn last_captured_text(&self) -> Option<&str> {
        self.last_captured_text.as_deref()
    }

    /// Handle a push notification from the host.
    pub fn on_notification(
        &mut self,
        backend: &mut dyn ClipboardBackend,
        store: &mut HistoryStore,
    ) -> CaptureOutcome {
        if self.take_suppression() {
            return CaptureOutcome::Suppressed;
        }
        self.capture(backend, store)
    }

    /// Handle a poll tick.
    ///
    /// A cheap probe is compared against the last one seen; only a changed
    /// probe leads to a full snapshot read.
    pub fn on_tick(
        &mut self,
        backend: &mut dyn ClipboardBackend,
        store: &mut HistoryStore,
    ) -> CaptureOutcome {
        let probe = match self.read_policy.run("probe", || backend.probe()) {
            Ok(probe) => probe,
            Err(e) => {
                debug!(error = %e, "Clipboard probe failed, skipping tick");
                return CaptureOutcome::ReadFailed;
            }
        };

        if !self.detector.has_changed(probe) {
            trace!("Clipboard unchanged");
            return CaptureOutcome::Unchanged;
        }
        if self.take_suppression() {
            return CaptureOutcome::Suppressed;
        }
        if probe == ClipboardProbe::Empty {
            return CaptureOutcome::Empty;
        }
        self.capture(backend, store)
    }

    /// Capture whatever is on the clipboard right now, ignoring suppression.
    ///
    /// Used once at startup.
    pub fn capture_now(
        &mut self,
        backend: &mut dyn ClipboardBackend,
        store: &mut HistoryStore,
    ) -> CaptureOutcome {
        self.capture(backend, store)
    }

    /// Settle the suppression flag after the playback controller wrote.
    ///
    /// A failed write never produces a notification, so the flag is
    /// dropped. In poll mode the written content is recorded as already
    /// seen so the next tick does not mistake it for an external change.
    pub fn finish_self_write(&mut self, backend: &mut dyn ClipboardBackend, succeeded: bool) {
        if !succeeded {
            self.suppress_next_capture = false;
            return;
        }
        if self.mode == MonitorMode::Push {
            return;
        }

        match self.read_policy.run("probe", || backend.probe()) {
            Ok(probe) => {
                self.detector.mark_seen(probe);
                self.suppress_next_capture = false;
            }
            // Flag stays set; the next changed tick is treated as ours
            Err(e) => debug!(error = %e, "Could not probe clipboard after write"),
        }
    }

    fn take_suppression(&mut self) -> bool {
        if self.suppress_next_capture {
            self.suppress_next_capture = false;
            debug!("Skipping self-triggered clipboard change");
            true
        } else {
            false
        }
    }

    /// Plain-text-only snapshot equal to the last captured text, with a
    /// head that holds exactly that one text payload. Anything richer goes
    /// through the codec and the store's full equivalence check.
    fn is_repeat_of_head_text(&self, snapshot: &NativeSnapshot, store: &HistoryStore) -> bool {
        if snapshot.len() != 1 {
            return false;
        }
        let (Some(text), Some(last)) = (snapshot.text(), self.last_captured_text.as_deref()) else {
            return false;
        };
        text == last
            && store
                .head()
                .is_some_and(|head| head.payloads().len() == 1 && head.text() == Some(text))
    }

    fn capture(
        &mut self,
        backend: &mut dyn ClipboardBackend,
        store: &mut HistoryStore,
    ) -> CaptureOutcome {
        let snapshot = match self.read_policy.run("read", || backend.read_snapshot()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Clipboard read failed, capture skipped");
                return CaptureOutcome::ReadFailed;
            }
        };
        self.detector
            .mark_seen(ClipboardProbe::from_snapshot(&snapshot));

        if self.is_repeat_of_head_text(&snapshot, store) {
            return CaptureOutcome::Duplicate;
        }

        let payloads = self.codec.capture(&snapshot);
        let Some(entry) = Entry::from_payloads(payloads) else {
            debug!(
                formats = snapshot.len(),
                "No clipboard format could be captured"
            );
            return CaptureOutcome::Empty;
        };

        let id = entry.id().to_string();
        let text = entry.text().map(str::to_string);
        if store.try_insert(entry) {
            self.last_captured_text = text;
            CaptureOutcome::Inserted(id)
        } else {
            CaptureOutcome::Duplicate
        }
    }
}
