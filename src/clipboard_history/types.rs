//! Clipboard history types
//!
//! An [`Entry`] is one captured clipboard state. It owns one or more
//! [`FormatPayload`]s, each holding the bytes of a single named clipboard
//! format. Entries are never constructed without at least one payload.

use chrono::Utc;
use uuid::Uuid;

/// Maximum number of characters shown in an entry preview before truncation
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Plain text format name
pub const FORMAT_TEXT: &str = "Text";
/// HTML fragment format name
pub const FORMAT_HTML: &str = "HTML";
/// Rich text format name
pub const FORMAT_RTF: &str = "RTF";
/// Bitmap image format name (stored as PNG)
pub const FORMAT_IMAGE: &str = "Image";

/// Storage kind of a single clipboard format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// UTF-8 encoded text
    Text,
    /// PNG encoded image
    Image,
    /// Raw bytes, restored verbatim
    Binary,
    /// A native object serialized as JSON
    OpaqueSerialized,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Image => "image",
            PayloadKind::Binary => "binary",
            PayloadKind::OpaqueSerialized => "opaque",
        }
    }

    pub(crate) fn to_tag(self) -> u8 {
        match self {
            PayloadKind::Text => 0,
            PayloadKind::Image => 1,
            PayloadKind::Binary => 2,
            PayloadKind::OpaqueSerialized => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(PayloadKind::Text),
            1 => Some(PayloadKind::Image),
            2 => Some(PayloadKind::Binary),
            3 => Some(PayloadKind::OpaqueSerialized),
            _ => None,
        }
    }

    /// Kind implied by a format name alone.
    ///
    /// Used for persisted records written before the kind tag was stored.
    pub fn infer_from_format(format: &str) -> Self {
        let lower = format.to_ascii_lowercase();
        match lower.as_str() {
            "text" | "unicodetext" | "html" | "rtf" => PayloadKind::Text,
            "image" | "bitmap" | "png" => PayloadKind::Image,
            _ => PayloadKind::Binary,
        }
    }
}

/// One format's data within an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPayload {
    pub format: String,
    pub kind: PayloadKind,
    pub bytes: Vec<u8>,
}

impl FormatPayload {
    pub fn new(format: impl Into<String>, kind: PayloadKind, bytes: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            kind,
            bytes,
        }
    }

    /// Text payload, stored as UTF-8
    pub fn text(format: impl Into<String>, text: &str) -> Self {
        Self::new(format, PayloadKind::Text, text.as_bytes().to_vec())
    }

    /// Decoded text, if this is a text payload holding valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        if self.kind != PayloadKind::Text {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Format names compare case-insensitively
    pub fn has_format(&self, format: &str) -> bool {
        self.format.eq_ignore_ascii_case(format)
    }

    /// Same format (ignoring case), same kind, byte-identical content
    pub fn is_equivalent(&self, other: &FormatPayload) -> bool {
        self.has_format(&other.format) && self.kind == other.kind && self.bytes == other.bytes
    }
}

/// One captured clipboard state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: String,
    timestamp: i64,
    payloads: Vec<FormatPayload>,
    preview: String,
    favorite: bool,
}

impl Entry {
    /// Build a freshly captured entry (new id, current time).
    ///
    /// Returns `None` when `payloads` is empty. Later payloads whose format
    /// name repeats an earlier one (ignoring case) are dropped.
    pub fn from_payloads(payloads: Vec<FormatPayload>) -> Option<Self> {
        Self::from_parts(
            Uuid::new_v4().to_string(),
            Utc::now().timestamp_millis(),
            payloads,
            false,
        )
    }

    /// Convenience constructor for a single plain-text entry
    pub fn from_text(text: &str) -> Self {
        let payloads = vec![FormatPayload::text(FORMAT_TEXT, text)];
        let preview = build_preview(&payloads);
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            payloads,
            preview,
            favorite: false,
        }
    }

    pub(crate) fn from_parts(
        id: String,
        timestamp: i64,
        payloads: Vec<FormatPayload>,
        favorite: bool,
    ) -> Option<Self> {
        let mut unique: Vec<FormatPayload> = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if !unique.iter().any(|p| p.has_format(&payload.format)) {
                unique.push(payload);
            }
        }
        if unique.is_empty() {
            return None;
        }

        let preview = build_preview(&unique);
        Some(Self {
            id,
            timestamp,
            payloads: unique,
            preview,
            favorite,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capture time in unix milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payloads(&self) -> &[FormatPayload] {
        &self.payloads
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite
    }

    /// Payload for a format name (case-insensitive)
    pub fn payload(&self, format: &str) -> Option<&FormatPayload> {
        self.payloads.iter().find(|p| p.has_format(format))
    }

    /// Plain text content of the entry, if it carries a `Text` payload
    pub fn text(&self) -> Option<&str> {
        self.payload(FORMAT_TEXT).and_then(FormatPayload::as_text)
    }

    /// Positional payload equivalence used by the history head check
    pub fn is_equivalent(&self, other: &Entry) -> bool {
        self.payloads.len() == other.payloads.len()
            && self
                .payloads
                .iter()
                .zip(other.payloads.iter())
                .all(|(a, b)| a.is_equivalent(b))
    }

    /// Case-insensitive substring match against the text content.
    ///
    /// `needle_lower` must already be lowercased.
    pub(crate) fn text_contains(&self, needle_lower: &str) -> bool {
        self.text()
            .is_some_and(|text| text.to_lowercase().contains(needle_lower))
    }

    pub(crate) fn toggle_favorite(&mut self) -> bool {
        self.favorite = !self.favorite;
        self.favorite
    }

    pub(crate) fn set_favorite(&mut self, favorite: bool) {
        self.favorite = favorite;
    }

    /// Replace (or add) the plain text payload and refresh the preview
    pub(crate) fn replace_text(&mut self, text: &str) {
        match self.payloads.iter_mut().find(|p| p.has_format(FORMAT_TEXT)) {
            Some(payload) => {
                payload.kind = PayloadKind::Text;
                payload.bytes = text.as_bytes().to_vec();
            }
            None => self.payloads.insert(0, FormatPayload::text(FORMAT_TEXT, text)),
        }
        self.preview = build_preview(&self.payloads);
    }
}

/// Preview is the (truncated) plain text when present, else the first format's name
fn build_preview(payloads: &[FormatPayload]) -> String {
    let text = payloads
        .iter()
        .find(|p| p.has_format(FORMAT_TEXT))
        .and_then(FormatPayload::as_text)
        .filter(|t| !t.is_empty());

    match text {
        Some(text) => truncate_preview(text),
        None => payloads
            .first()
            .map(|p| p.format.clone())
            .unwrap_or_default(),
    }
}

fn truncate_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_tag_roundtrip() {
        for kind in [
            PayloadKind::Text,
            PayloadKind::Image,
            PayloadKind::Binary,
            PayloadKind::OpaqueSerialized,
        ] {
            assert_eq!(PayloadKind::from_tag(kind.to_tag()), Some(kind));
        }
        assert_eq!(PayloadKind::from_tag(42), None);
    }

    #[test]
    fn test_infer_kind_from_format_name() {
        assert_eq!(PayloadKind::infer_from_format("Text"), PayloadKind::Text);
        assert_eq!(PayloadKind::infer_from_format("html"), PayloadKind::Text);
        assert_eq!(PayloadKind::infer_from_format("RTF"), PayloadKind::Text);
        assert_eq!(PayloadKind::infer_from_format("Image"), PayloadKind::Image);
        assert_eq!(
            PayloadKind::infer_from_format("application/x-custom"),
            PayloadKind::Binary
        );
    }

    #[test]
    fn test_entry_requires_payload() {
        assert!(Entry::from_payloads(Vec::new()).is_none());
    }

    #[test]
    fn test_entry_drops_repeated_format_names() {
        let entry = Entry::from_payloads(vec![
            FormatPayload::text("Text", "first"),
            FormatPayload::text("TEXT", "second"),
            FormatPayload::new("custom", PayloadKind::Binary, vec![1, 2]),
        ])
        .expect("entry should be built");

        assert_eq!(entry.payloads().len(), 2);
        assert_eq!(entry.text(), Some("first"));
    }

    #[test]
    fn test_preview_prefers_text() {
        let entry = Entry::from_payloads(vec![
            FormatPayload::text(FORMAT_HTML, "<b>hi</b>"),
            FormatPayload::text(FORMAT_TEXT, "hi"),
        ])
        .unwrap();
        assert_eq!(entry.preview(), "hi");
    }

    #[test]
    fn test_preview_falls_back_to_format_name() {
        let entry = Entry::from_payloads(vec![FormatPayload::new(
            FORMAT_IMAGE,
            PayloadKind::Image,
            vec![0x89, b'P', b'N', b'G'],
        )])
        .unwrap();
        assert_eq!(entry.preview(), "Image");
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "é".repeat(PREVIEW_MAX_CHARS + 10);
        let entry = Entry::from_text(&long);
        assert!(entry.preview().ends_with("..."));
        assert_eq!(entry.preview().chars().count(), PREVIEW_MAX_CHARS + 3);
    }

    #[test]
    fn test_equivalence_ignores_format_case_only() {
        let a = Entry::from_payloads(vec![FormatPayload::text("Text", "hello")]).unwrap();
        let b = Entry::from_payloads(vec![FormatPayload::text("text", "hello")]).unwrap();
        let c = Entry::from_payloads(vec![FormatPayload::new(
            "Text",
            PayloadKind::Binary,
            b"hello".to_vec(),
        )])
        .unwrap();

        assert!(a.is_equivalent(&b), "format names compare case-insensitively");
        assert!(!a.is_equivalent(&c), "kind must match");
    }

    #[test]
    fn test_equivalence_is_positional() {
        let a = Entry::from_payloads(vec![
            FormatPayload::text(FORMAT_TEXT, "x"),
            FormatPayload::text(FORMAT_HTML, "<p>x</p>"),
        ])
        .unwrap();
        let b = Entry::from_payloads(vec![
            FormatPayload::text(FORMAT_HTML, "<p>x</p>"),
            FormatPayload::text(FORMAT_TEXT, "x"),
        ])
        .unwrap();
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn test_replace_text_updates_preview() {
        let mut entry = Entry::from_text("before");
        entry.replace_text("after");
        assert_eq!(entry.text(), Some("after"));
        assert_eq!(entry.preview(), "after");
    }

    #[test]
    fn test_replace_text_adds_text_payload_when_missing() {
        let mut entry = Entry::from_payloads(vec![FormatPayload::new(
            "custom",
            PayloadKind::Binary,
            vec![7],
        )])
        .unwrap();
        entry.replace_text("note");
        assert_eq!(entry.payloads().len(), 2);
        assert_eq!(entry.payloads()[0].format, FORMAT_TEXT);
        assert_eq!(entry.preview(), "note");
    }

    #[test]
    fn test_text_contains_is_case_insensitive() {
        let entry = Entry::from_text("Hello ABC world");
        assert!(entry.text_contains("abc"));
        assert!(!entry.text_contains("xyz"));
    }
}
