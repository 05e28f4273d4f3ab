//! Format payload codec
//!
//! Converts a native clipboard snapshot into storage-stable payloads and
//! back. The codec never fails as a whole: a format that cannot be captured
//! or restored is skipped and the rest of the snapshot goes through.

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use super::image::{decode_png_to_image_data, encode_image_to_png_bytes, get_png_dimensions};
use super::types::{FormatPayload, PayloadKind, FORMAT_TEXT};
use crate::config::DEFAULT_MAX_TEXT_LENGTH;

/// A clipboard format value in the form the OS clipboard API deals in
#[derive(Debug, Clone)]
pub enum NativeValue {
    Text(String),
    /// Raw RGBA bitmap
    Image(arboard::ImageData<'static>),
    /// Already-encoded PNG image
    Png(Vec<u8>),
    Bytes(Vec<u8>),
    /// Any other structured object the host hands out
    Object(serde_json::Value),
}

/// The set of named formats present on the clipboard at one moment
#[derive(Debug, Clone, Default)]
pub struct NativeSnapshot {
    formats: Vec<(String, NativeValue)>,
}

impl NativeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, format: impl Into<String>, value: NativeValue) -> Self {
        self.push(format, value);
        self
    }

    pub fn push(&mut self, format: impl Into<String>, value: NativeValue) {
        self.formats.push((format.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NativeValue)> {
        self.formats.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Value for a format name (case-insensitive)
    pub fn get(&self, format: &str) -> Option<&NativeValue> {
        self.formats
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(format))
            .map(|(_, v)| v)
    }

    /// Plain text, if the snapshot carries it
    pub fn text(&self) -> Option<&str> {
        match self.get(FORMAT_TEXT) {
            Some(NativeValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Pure transform between native snapshots and format payloads
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    max_text_len: usize,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_LENGTH)
    }
}

impl PayloadCodec {
    pub fn new(max_text_len: usize) -> Self {
        Self { max_text_len }
    }

    /// Capture every format of `snapshot` that can be made storage-stable.
    ///
    /// Formats that fail are dropped; the result may be empty.
    pub fn capture(&self, snapshot: &NativeSnapshot) -> Vec<FormatPayload> {
        let mut payloads = Vec::with_capacity(snapshot.len());
        for (format, value) in snapshot.iter() {
            if payloads
                .iter()
                .any(|p: &FormatPayload| p.has_format(format))
            {
                continue;
            }
            match self.capture_one(format, value) {
                Ok(payload) => payloads.push(payload),
                Err(e) => debug!(format, error = %e, "Skipping clipboard format"),
            }
        }
        payloads
    }

    fn capture_one(&self, format: &str, value: &NativeValue) -> Result<FormatPayload> {
        match value {
            NativeValue::Text(text) => {
                if text.is_empty() {
                    bail!("empty text");
                }
                if text.len() > self.max_text_len {
                    warn!(
                        format,
                        text_len = text.len(),
                        max_len = self.max_text_len,
                        "Skipping oversized clipboard text"
                    );
                    bail!("text exceeds {} bytes", self.max_text_len);
                }
                Ok(FormatPayload::text(format, text))
            }
            NativeValue::Image(image) => {
                let png = encode_image_to_png_bytes(image)?;
                Ok(FormatPayload::new(format, PayloadKind::Image, png))
            }
            NativeValue::Png(png) => {
                get_png_dimensions(png).context("invalid PNG data")?;
                Ok(FormatPayload::new(format, PayloadKind::Image, png.clone()))
            }
            NativeValue::Bytes(bytes) => {
                Ok(FormatPayload::new(format, PayloadKind::Binary, bytes.clone()))
            }
            NativeValue::Object(object) => {
                let bytes = serde_json::to_vec(object).context("object is not serializable")?;
                Ok(FormatPayload::new(
                    format,
                    PayloadKind::OpaqueSerialized,
                    bytes,
                ))
            }
        }
    }

    /// Inverse of [`capture`](Self::capture) for one payload.
    ///
    /// `None` means the payload could not be restored and the caller should
    /// skip that format.
    pub fn restore(&self, payload: &FormatPayload) -> Option<NativeValue> {
        match payload.kind {
            PayloadKind::Text => match String::from_utf8(payload.bytes.clone()) {
                Ok(text) => Some(NativeValue::Text(text)),
                Err(e) => {
                    warn!(format = %payload.format, error = %e, "Stored text is not UTF-8");
                    None
                }
            },
            PayloadKind::Image => decode_png_to_image_data(&payload.bytes).map(NativeValue::Image),
            PayloadKind::Binary => Some(NativeValue::Bytes(payload.bytes.clone())),
            PayloadKind::OpaqueSerialized => {
                match serde_json::from_slice::<serde_json::Value>(&payload.bytes) {
                    Ok(object) => Some(NativeValue::Object(object)),
                    Err(e) => {
                        debug!(format = %payload.format, error = %e, "Opaque payload did not deserialize");
                        None
                    }
                }
            }
        }
    }

    /// Restore every payload into one snapshot, skipping unrestorable formats
    pub fn restore_all(&self, payloads: &[FormatPayload]) -> NativeSnapshot {
        let mut snapshot = NativeSnapshot::new();
        for payload in payloads {
            if let Some(value) = self.restore(payload) {
                snapshot.push(payload.format.clone(), value);
            }
        }
        snapshot
    }
}
