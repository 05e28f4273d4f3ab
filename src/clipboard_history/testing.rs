//! In-memory test doubles for the clipboard and keystroke seams

use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use super::backend::{BackendError, ClipboardBackend};
use super::codec::{NativeSnapshot, NativeValue};
use super::keystroke::KeystrokeInjector;
use super::playback::Presenter;
use super::types::FORMAT_TEXT;

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: NativeSnapshot,
    busy_reads: u32,
    busy_writes: u32,
    always_busy: bool,
    reads: u32,
    writes: u32,
}

/// Clipboard held in memory. Clones share state, so a test can keep a
/// handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let clipboard = Self::new();
        clipboard.set_text(text);
        clipboard
    }

    /// Simulate another application copying text
    pub fn set_text(&self, text: &str) {
        self.set_snapshot(NativeSnapshot::new().with(FORMAT_TEXT, NativeValue::Text(text.into())));
    }

    pub fn set_snapshot(&self, snapshot: NativeSnapshot) {
        self.state.lock().snapshot = snapshot;
    }

    pub fn contents(&self) -> NativeSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().snapshot.text().map(str::to_string)
    }

    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().busy_reads = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.state.lock().busy_writes = count;
    }

    /// Report busy for every read and write until turned off
    pub fn set_always_busy(&self, busy: bool) {
        self.state.lock().always_busy = busy;
    }

    pub fn read_count(&self) -> u32 {
        self.state.lock().reads
    }

    pub fn write_count(&self) -> u32 {
        self.state.lock().writes
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read_snapshot(&mut self) -> Result<NativeSnapshot, BackendError> {
        let mut state = self.state.lock();
        state.reads += 1;
        if state.always_busy {
            return Err(BackendError::Busy);
        }
        if state.busy_reads > 0 {
            state.busy_reads -= 1;
            return Err(BackendError::Busy);
        }
        Ok(state.snapshot.clone())
    }

    fn write_snapshot(&mut self, snapshot: &NativeSnapshot) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.writes += 1;
        if state.always_busy {
            return Err(BackendError::Busy);
        }
        if state.busy_writes > 0 {
            state.busy_writes -= 1;
            return Err(BackendError::Busy);
        }
        if snapshot.is_empty() {
            return Err(BackendError::Unsupported("empty write".into()));
        }
        state.snapshot = snapshot.clone();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InjectorState {
    pastes: u32,
    fail: bool,
}

/// Keystroke injector that counts paste gestures instead of sending them
#[derive(Debug, Clone, Default)]
pub struct RecordingInjector {
    state: Arc<Mutex<InjectorState>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let injector = Self::new();
        injector.state.lock().fail = true;
        injector
    }

    pub fn paste_count(&self) -> u32 {
        self.state.lock().pastes
    }
}

impl KeystrokeInjector for RecordingInjector {
    fn send_paste(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail {
            bail!("input injection denied");
        }
        state.pastes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    hides: Arc<Mutex<u32>>,
}

impl RecordingPresenter {
    pub fn hide_count(&self) -> u32 {
        *self.hides.lock()
    }
}

impl Presenter for RecordingPresenter {
    fn hide(&mut self) {
        *self.hides.lock() += 1;
    }
}
