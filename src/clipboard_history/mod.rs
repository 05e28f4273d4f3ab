//! Clipboard History Module
//!
//! Captures every change to the system clipboard as a multi-format entry,
//! keeps a bounded newest-first history, persists it across restarts and
//! writes entries back to the clipboard (optionally pasting them into the
//! focused application).
//!
//! ## Features
//! - All readable formats of a clipboard change stored as one entry
//! - Push (change notification) or poll driven capture
//! - Consecutive duplicates collapsed, self-writes never re-captured
//! - Favorites, in-place text edits, search and favorites-only views
//! - Binary history file rewritten atomically after every mutation
//! - Retry with backoff while another process holds the clipboard
//!
//! ## Module Structure
//! - `types`: Core types (PayloadKind, FormatPayload, Entry)
//! - `codec`: Native clipboard values to/from stored payloads
//! - `image`: PNG encoding/decoding for image payloads
//! - `change_detection`: Cheap clipboard probes for polling
//! - `backend`: System clipboard access (arboard)
//! - `rtf`: Plain text from RTF for clipboards that cannot write RTF
//! - `retry`: Bounded retry for a busy clipboard
//! - `monitor`: Change monitor and capture pipeline
//! - `history`: In-memory history store and filtered views
//! - `persistence`: History and settings files
//! - `settings`: Window position, theme and first-run flag
//! - `keystroke`: Paste keystroke injection
//! - `playback`: Copy/paste of stored entries
//! - `engine`: Single-threaded engine and its worker thread handle

mod backend;
mod change_detection;
mod codec;
mod engine;
mod history;
mod image;
mod keystroke;
mod monitor;
mod persistence;
mod playback;
mod retry;
mod rtf;
mod settings;
mod types;

#[cfg(test)]
mod testing;

// Re-export public API
// Some may appear unused in this crate but are used by embedders.

// Types
#[allow(unused_imports)]
pub use types::{
    Entry, FormatPayload, PayloadKind, FORMAT_HTML, FORMAT_IMAGE, FORMAT_RTF, FORMAT_TEXT,
    PREVIEW_MAX_CHARS,
};

// Codec
#[allow(unused_imports)]
pub use codec::{NativeSnapshot, NativeValue, PayloadCodec};

// Clipboard access
#[allow(unused_imports)]
pub use backend::{ArboardBackend, BackendError, ClipboardBackend, DetachedBackend};
#[allow(unused_imports)]
pub use change_detection::ClipboardProbe;
#[allow(unused_imports)]
pub use retry::RetryPolicy;

// Monitor and store
#[allow(unused_imports)]
pub use history::{HistoryStore, ViewFilter};
#[allow(unused_imports)]
pub use monitor::{CaptureOutcome, ChangeMonitor, MonitorMode};

// Persistence
#[allow(unused_imports)]
pub use persistence::{Persistence, HISTORY_FILE_NAME, SETTINGS_FILE_NAME};
#[allow(unused_imports)]
pub use settings::{Settings, Theme, WindowPosition};

// Playback
#[allow(unused_imports)]
pub use keystroke::{KeystrokeInjector, SystemKeystrokeInjector};
#[allow(unused_imports)]
pub use playback::{NoopPresenter, PlaybackState, Presenter};

// Engine
#[allow(unused_imports)]
pub use engine::{
    ClipboardEngine, EngineEvent, EngineHandle, EngineOptions, EngineRequest, SettingsUpdate,
};
