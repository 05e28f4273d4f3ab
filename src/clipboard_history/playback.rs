//! Playback controller
//!
//! Writes a stored entry back onto the clipboard and optionally follows it
//! with a synthesized paste. State machine for one paste request:
//!
//! ```text
//! Idle -> SettingClipboard -> ClipboardSet -> Hiding -> Waiting -> SendingKeys -> Idle
//! Idle -> SettingClipboard -> Failed -> Idle
//! ```
//!
//! The clipboard write is the correctness-critical step. Once it has
//! succeeded, a keystroke failure is reported but leaves clipboard and
//! history untouched.

use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::{BackendError, ClipboardBackend};
use super::codec::PayloadCodec;
use super::keystroke::KeystrokeInjector;
use super::monitor::ChangeMonitor;
use super::retry::RetryPolicy;
use super::types::Entry;
use crate::error::ClipboardHistoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    SettingClipboard,
    ClipboardSet,
    Hiding,
    Waiting,
    SendingKeys,
    Failed,
}

/// The UI that presented the entry; hidden before the paste keystroke so
/// focus returns to the previously active window
pub trait Presenter {
    fn hide(&mut self);
}

/// Presenter for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn hide(&mut self) {}
}

pub struct PlaybackController {
    write_policy: RetryPolicy,
    settle_delay: Duration,
    codec: PayloadCodec,
    injector: Box<dyn KeystrokeInjector>,
    presenter: Box<dyn Presenter>,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(
        write_policy: RetryPolicy,
        settle_delay: Duration,
        codec: PayloadCodec,
        injector: Box<dyn KeystrokeInjector>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        Self {
            write_policy,
            settle_delay,
            codec,
            injector,
            presenter,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    fn transition(&mut self, next: PlaybackState) {
        debug!(from = ?self.state, to = ?next, "Playback state");
        self.state = next;
    }

    /// Restore every payload of `entry` and write them in one clipboard write.
    ///
    /// The monitor is told to ignore the change this write causes.
    pub fn apply_to_clipboard(
        &mut self,
        entry: &Entry,
        backend: &mut dyn ClipboardBackend,
        monitor: &mut ChangeMonitor,
    ) -> Result<(), ClipboardHistoryError> {
        self.transition(PlaybackState::SettingClipboard);

        let snapshot = self.codec.restore_all(entry.payloads());
        if snapshot.is_empty() {
            warn!(entry_id = %entry.id(), "No payload of entry could be restored");
            return Err(self.fail(ClipboardHistoryError::NothingToWrite));
        }

        monitor.suppress_next_capture();
        let result = self
            .write_policy
            .run("write", || backend.write_snapshot(&snapshot));
        monitor.finish_self_write(backend, result.is_ok());

        match result {
            Ok(()) => {
                self.transition(PlaybackState::ClipboardSet);
                info!(
                    entry_id = %entry.id(),
                    formats = snapshot.len(),
                    "Entry written to clipboard"
                );
                Ok(())
            }
            Err(e) => {
                warn!(entry_id = %entry.id(), error = %e, "Clipboard write failed");
                let err = self.map_backend_error(e);
                Err(self.fail(err))
            }
        }
    }

    /// Copy only: write the entry and return to idle
    pub fn copy(
        &mut self,
        entry: &Entry,
        backend: &mut dyn ClipboardBackend,
        monitor: &mut ChangeMonitor,
    ) -> Result<(), ClipboardHistoryError> {
        self.apply_to_clipboard(entry, backend, monitor)?;
        self.transition(PlaybackState::Idle);
        Ok(())
    }

    /// Write the entry, hide the presenter, wait for focus to settle, then
    /// send the paste keystroke.
    pub fn paste_selected(
        &mut self,
        entry: &Entry,
        backend: &mut dyn ClipboardBackend,
        monitor: &mut ChangeMonitor,
    ) -> Result<(), ClipboardHistoryError> {
        self.apply_to_clipboard(entry, backend, monitor)?;

        self.transition(PlaybackState::Hiding);
        self.presenter.hide();

        self.transition(PlaybackState::Waiting);
        thread::sleep(self.settle_delay);

        self.transition(PlaybackState::SendingKeys);
        let result = self.injector.send_paste();
        self.transition(PlaybackState::Idle);

        result.map_err(|e| {
            warn!(entry_id = %entry.id(), error = %e, "Paste keystroke failed");
            ClipboardHistoryError::KeystrokeInjection(format!("{:#}", e))
        })
    }

    fn map_backend_error(&self, e: BackendError) -> ClipboardHistoryError {
        match e {
            BackendError::Busy => ClipboardHistoryError::ClipboardBusy {
                attempts: self.write_policy.attempts,
            },
            other => ClipboardHistoryError::ClipboardUnavailable(other.to_string()),
        }
    }

    fn fail(&mut self, err: ClipboardHistoryError) -> ClipboardHistoryError {
        self.transition(PlaybackState::Failed);
        self.transition(PlaybackState::Idle);
        err
    }
}
