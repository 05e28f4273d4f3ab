//! System clipboard access
//!
//! [`ClipboardBackend`] is the seam between the engine and the OS clipboard.
//! The production implementation wraps `arboard`; tests swap in an
//! in-memory clipboard.

use arboard::Clipboard;
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

use super::change_detection::{compute_text_hash, ClipboardProbe};
use super::codec::{NativeSnapshot, NativeValue};
use super::image::compute_image_hash;
use super::rtf::rtf_to_plain_text;
use super::types::{FORMAT_HTML, FORMAT_IMAGE, FORMAT_RTF, FORMAT_TEXT};

/// Failure reported by a clipboard backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Another process holds the clipboard right now
    #[error("clipboard is held by another process")]
    Busy,

    #[error("clipboard holds no readable content")]
    Empty,

    #[error("clipboard content not supported: {0}")]
    Unsupported(String),

    #[error("clipboard error: {0}")]
    Other(String),
}

impl BackendError {
    /// Only contention is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Busy)
    }
}

impl From<arboard::Error> for BackendError {
    fn from(e: arboard::Error) -> Self {
        match e {
            arboard::Error::ClipboardOccupied => BackendError::Busy,
            arboard::Error::ContentNotAvailable => BackendError::Empty,
            arboard::Error::ConversionFailure => {
                BackendError::Unsupported("format conversion failed".to_string())
            }
            arboard::Error::ClipboardNotSupported => {
                BackendError::Unsupported("clipboard not supported".to_string())
            }
            other => BackendError::Other(other.to_string()),
        }
    }
}

/// Read/write access to a multi-format clipboard
pub trait ClipboardBackend {
    /// Read every available format
    fn read_snapshot(&mut self) -> Result<NativeSnapshot, BackendError>;

    /// Replace the clipboard contents with `snapshot` in a single write
    fn write_snapshot(&mut self, snapshot: &NativeSnapshot) -> Result<(), BackendError>;

    /// Cheap sample of the clipboard for poll-based change detection.
    ///
    /// The default reads a full snapshot; backends with a cheaper path
    /// should override it.
    fn probe(&mut self) -> Result<ClipboardProbe, BackendError> {
        let snapshot = self.read_snapshot()?;
        Ok(ClipboardProbe::from_snapshot(&snapshot))
    }
}

/// `arboard`-backed system clipboard
pub struct ArboardBackend {
    clipboard: Clipboard,
}

impl ArboardBackend {
    pub fn new() -> Result<Self, BackendError> {
        let clipboard = Clipboard::new().map_err(BackendError::from)?;
        Ok(Self { clipboard })
    }

    fn read_text(&mut self) -> Result<Option<String>, BackendError> {
        match self.clipboard.get_text() {
            Ok(text) if !text.is_empty() => Ok(Some(text)),
            Ok(_) => Ok(None),
            Err(e) => match BackendError::from(e) {
                BackendError::Busy => Err(BackendError::Busy),
                _ => Ok(None),
            },
        }
    }

    fn read_html(&mut self) -> Result<Option<String>, BackendError> {
        match self.clipboard.get().html() {
            Ok(html) if !html.is_empty() => Ok(Some(html)),
            Ok(_) => Ok(None),
            Err(e) => match BackendError::from(e) {
                BackendError::Busy => Err(BackendError::Busy),
                _ => Ok(None),
            },
        }
    }

    fn read_image(&mut self) -> Result<Option<arboard::ImageData<'static>>, BackendError> {
        match self.clipboard.get_image() {
            Ok(image) => Ok(Some(image)),
            Err(e) => match BackendError::from(e) {
                BackendError::Busy => Err(BackendError::Busy),
                _ => Ok(None),
            },
        }
    }
}

impl ClipboardBackend for ArboardBackend {
    fn read_snapshot(&mut self) -> Result<NativeSnapshot, BackendError> {
        let mut snapshot = NativeSnapshot::new();
        if let Some(text) = self.read_text()? {
            snapshot.push(FORMAT_TEXT, NativeValue::Text(text));
        }
        if let Some(html) = self.read_html()? {
            snapshot.push(FORMAT_HTML, NativeValue::Text(html));
        }
        if let Some(image) = self.read_image()? {
            snapshot.push(FORMAT_IMAGE, NativeValue::Image(image));
        }
        Ok(snapshot)
    }

    fn write_snapshot(&mut self, snapshot: &NativeSnapshot) -> Result<(), BackendError> {
        let plan = plan_write(snapshot)?;
        let written: &[&str] = match plan {
            WritePlan::Html { html, alt_text } => {
                self.clipboard.set_html(Cow::Borrowed(html), alt_text)?;
                &[FORMAT_HTML, FORMAT_TEXT]
            }
            WritePlan::Text(text) => {
                self.clipboard.set_text(text)?;
                &[FORMAT_TEXT]
            }
            WritePlan::Image(image) => {
                self.clipboard.set_image(image.clone())?;
                &[FORMAT_IMAGE]
            }
        };

        let skipped: Vec<&str> = snapshot
            .iter()
            .map(|(format, _)| format)
            .filter(|f| !written.iter().any(|w| f.eq_ignore_ascii_case(w)))
            .collect();
        if !skipped.is_empty() {
            debug!(?skipped, "Formats not written to system clipboard");
        }
        Ok(())
    }

    fn probe(&mut self) -> Result<ClipboardProbe, BackendError> {
        if let Some(text) = self.read_text()? {
            return Ok(ClipboardProbe::Text(compute_text_hash(&text)));
        }
        if let Some(html) = self.read_html()? {
            return Ok(ClipboardProbe::Other(compute_text_hash(&html)));
        }
        match self.read_image()? {
            Some(image) => Ok(ClipboardProbe::Image(compute_image_hash(&image))),
            None => Ok(ClipboardProbe::Empty),
        }
    }
}

/// What a single-representation clipboard write puts on the clipboard
enum WritePlan<'a> {
    Html {
        html: &'a str,
        alt_text: Option<Cow<'a, str>>,
    },
    Text(Cow<'a, str>),
    Image(&'a arboard::ImageData<'static>),
}

/// Pick the one representation arboard will write for `snapshot`.
///
/// HTML (with a plain-text alternative) wins, then text, then image.
/// RTF cannot be written as-is, so an entry whose richest text form is RTF
/// goes out as its plain text.
fn plan_write(snapshot: &NativeSnapshot) -> Result<WritePlan<'_>, BackendError> {
    let text = snapshot.text().map(Cow::Borrowed);
    let rtf_text = || match snapshot.get(FORMAT_RTF) {
        Some(NativeValue::Text(rtf)) => {
            Some(rtf_to_plain_text(rtf)).filter(|plain| !plain.is_empty())
        }
        _ => None,
    };

    if let Some(NativeValue::Text(html)) = snapshot.get(FORMAT_HTML) {
        let alt_text = text.or_else(|| rtf_text().map(Cow::Owned));
        return Ok(WritePlan::Html { html, alt_text });
    }
    if let Some(text) = text {
        return Ok(WritePlan::Text(text));
    }
    if let Some(plain) = rtf_text() {
        debug!("Writing RTF entry as plain text");
        return Ok(WritePlan::Text(Cow::Owned(plain)));
    }
    let image = snapshot.iter().find_map(|(_, value)| match value {
        NativeValue::Image(image) => Some(image),
        _ => None,
    });
    match image {
        Some(image) => Ok(WritePlan::Image(image)),
        None => Err(BackendError::Unsupported(
            "no format this clipboard can write".to_string(),
        )),
    }
}

/// Stand-in used when no system clipboard can be opened (headless sessions).
/// Reads see an empty clipboard and writes fail.
pub struct DetachedBackend;

impl ClipboardBackend for DetachedBackend {
    fn read_snapshot(&mut self) -> Result<NativeSnapshot, BackendError> {
        Err(BackendError::Empty)
    }

    fn write_snapshot(&mut self, _snapshot: &NativeSnapshot) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("no system clipboard".to_string()))
    }

    fn probe(&mut self) -> Result<ClipboardProbe, BackendError> {
        Ok(ClipboardProbe::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_busy_is_transient() {
        assert!(BackendError::Busy.is_transient());
        assert!(!BackendError::Empty.is_transient());
        assert!(!BackendError::Other("x".into()).is_transient());
    }

    #[test]
    fn test_detached_backend_rejects_writes() {
        let mut backend = DetachedBackend;
        assert_eq!(backend.probe(), Ok(ClipboardProbe::Empty));
        let snapshot = NativeSnapshot::new().with(FORMAT_TEXT, NativeValue::Text("a".into()));
        assert!(matches!(
            backend.write_snapshot(&snapshot),
            Err(BackendError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rtf_only_entry_is_written_as_plain_text() {
        use crate::clipboard_history::codec::PayloadCodec;
        use crate::clipboard_history::types::FormatPayload;

        let payloads = vec![FormatPayload::text(
            FORMAT_RTF,
            r"{\rtf1\ansi{\fonttbl{\f0 Helvetica;}}\f0 Quarterly \b report\b0\par}",
        )];
        let snapshot = PayloadCodec::default().restore_all(&payloads);

        match plan_write(&snapshot) {
            Ok(WritePlan::Text(text)) => assert_eq!(text, "Quarterly report"),
            _ => panic!("RTF-only entry should be writable as text"),
        }
    }

    #[test]
    fn test_html_only_entry_is_written_as_html() {
        let snapshot =
            NativeSnapshot::new().with(FORMAT_HTML, NativeValue::Text("<b>hi</b>".into()));
        match plan_write(&snapshot) {
            Ok(WritePlan::Html { html, alt_text }) => {
                assert_eq!(html, "<b>hi</b>");
                assert!(alt_text.is_none());
            }
            _ => panic!("HTML-only entry should be writable as HTML"),
        }
    }

    #[test]
    fn test_html_with_rtf_uses_rtf_text_as_alternative() {
        let snapshot = NativeSnapshot::new()
            .with(FORMAT_HTML, NativeValue::Text("<i>note</i>".into()))
            .with(FORMAT_RTF, NativeValue::Text(r"{\rtf1 note}".into()));
        match plan_write(&snapshot) {
            Ok(WritePlan::Html { alt_text, .. }) => assert_eq!(alt_text.as_deref(), Some("note")),
            _ => panic!("HTML should win over RTF"),
        }
    }

    #[test]
    fn test_binary_only_entry_is_unsupported() {
        let snapshot = NativeSnapshot::new().with("Custom", NativeValue::Bytes(vec![1, 2, 3]));
        assert!(matches!(
            plan_write(&snapshot),
            Err(BackendError::Unsupported(_))
        ));
    }
}

#[cfg(all(test, feature = "system-tests"))]
mod system_tests {
    use super::*;

    #[test]
    fn test_text_roundtrip_through_system_clipboard() {
        let mut backend = ArboardBackend::new().expect("clipboard should open");
        let snapshot =
            NativeSnapshot::new().with(FORMAT_TEXT, NativeValue::Text("clipstack test".into()));
        backend.write_snapshot(&snapshot).expect("write should succeed");

        let read = backend.read_snapshot().expect("read should succeed");
        assert_eq!(read.text(), Some("clipstack test"));
    }
}
