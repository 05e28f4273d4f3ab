//! History and settings persistence
//!
//! Both files are length-prefixed little-endian binary records. Each history
//! record carries its own length so optional trailing fields can be added
//! without breaking older files: a field is read only if bytes remain in
//! its record, and takes a fixed default otherwise.
//!
//! History record layout (each record preceded by its `u32` byte length):
//!
//! ```text
//! i64 timestamp_millis, str format, str preview, u32 data_len + data
//! optional tail: u8 favorite, u8 kind, str id, u32 extra_count + extras
//! ```
//!
//! This is not the flat stream where the favorite byte sits between the
//! preview and the data. Here the favorite flag is the first optional tail
//! field after the data, and the per-record length is what tells a reader
//! whether any tail is present. Files in the flat layout are not readable.
//!
//! Saves go through a temp file and a rename so a crash mid-write never
//! leaves a torn file behind. Save failures are logged and swallowed; load
//! failures yield an empty history rather than a partial one.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::settings::{decode_settings, encode_settings, Settings};
use super::types::{Entry, FormatPayload, PayloadKind};
use crate::error::ResultExt;

pub const HISTORY_FILE_NAME: &str = "history.dat";
pub const SETTINGS_FILE_NAME: &str = "settings.dat";

// ============================================================================
// Byte-level helpers
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Length-prefixed byte block
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed UTF-8 string
    pub fn put_str(&mut self, s: &str) {
        self.put_bytes(s.as_bytes());
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            bail!(
                "unexpected end of data at offset {} (wanted {} bytes, {} left)",
                self.pos,
                len,
                self.remaining()
            );
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    pub fn str(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).context("string field is not UTF-8")
    }
}

// ============================================================================
// History encoding
// ============================================================================

pub fn encode_history(entries: &[Entry]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.put_u32(entries.len() as u32);
    for entry in entries {
        let record = encode_entry(entry);
        w.put_u32(record.len() as u32);
        w.put_raw(&record);
    }
    w.into_inner()
}

fn encode_entry(entry: &Entry) -> Vec<u8> {
    let mut w = ByteWriter::new();
    let (primary, extras) = match entry.payloads().split_first() {
        Some(split) => split,
        None => return w.into_inner(),
    };

    w.put_i64(entry.timestamp());
    w.put_str(&primary.format);
    w.put_str(entry.preview());
    w.put_bytes(&primary.bytes);

    // Optional tail
    w.put_u8(entry.is_favorite() as u8);
    w.put_u8(primary.kind.to_tag());
    w.put_str(entry.id());
    w.put_u32(extras.len() as u32);
    for payload in extras {
        w.put_str(&payload.format);
        w.put_u8(payload.kind.to_tag());
        w.put_bytes(&payload.bytes);
    }
    w.into_inner()
}

/// Decode a history file. Any malformed record fails the whole decode.
pub fn decode_history(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut r = ByteReader::new(bytes);
    let count = r.u32().context("history: entry count")? as usize;

    // Each record needs at least its 4-byte length prefix
    let mut entries = Vec::with_capacity(count.min(r.remaining() / 4));
    for index in 0..count {
        let len = r
            .u32()
            .with_context(|| format!("history: length of record {}", index))?;
        let record = r
            .take(len as usize)
            .with_context(|| format!("history: body of record {}", index))?;
        let entry =
            decode_entry(record).with_context(|| format!("history: record {}", index))?;
        entries.push(entry);
    }

    if !r.is_empty() {
        debug!(trailing = r.remaining(), "Ignoring trailing bytes in history file");
    }
    Ok(entries)
}

fn decode_kind(tag: u8, format: &str) -> PayloadKind {
    PayloadKind::from_tag(tag).unwrap_or_else(|| {
        debug!(tag, format, "Unknown payload kind, keeping bytes verbatim");
        PayloadKind::Binary
    })
}

fn decode_entry(record: &[u8]) -> Result<Entry> {
    let mut r = ByteReader::new(record);
    let timestamp = r.i64()?;
    let format = r.str()?;
    let preview = r.str()?;
    let data = r.bytes()?.to_vec();

    let has_tail = !r.is_empty();
    let favorite = if r.is_empty() { false } else { r.u8()? != 0 };
    let kind = if r.is_empty() {
        PayloadKind::infer_from_format(&format)
    } else {
        decode_kind(r.u8()?, &format)
    };
    let id = if r.is_empty() {
        String::new()
    } else {
        r.str()?
    };
    let id = if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    };

    // Single-format records from before the tail existed kept text only
    // in the preview field
    let data = if !has_tail && data.is_empty() && kind == PayloadKind::Text {
        preview.into_bytes()
    } else {
        data
    };

    let mut payloads = vec![FormatPayload::new(format, kind, data)];
    if !r.is_empty() {
        let extra_count = r.u32()?;
        for _ in 0..extra_count {
            let format = r.str()?;
            let kind = decode_kind(r.u8()?, &format);
            let bytes = r.bytes()?.to_vec();
            payloads.push(FormatPayload::new(format, kind, bytes));
        }
    }

    Entry::from_parts(id, timestamp, payloads, favorite).context("record has no payload")
}

// ============================================================================
// File store
// ============================================================================

/// File locations for the persisted history and settings
#[derive(Debug, Clone)]
pub struct Persistence {
    history_path: PathBuf,
    settings_path: PathBuf,
}

impl Persistence {
    pub fn new(history_path: impl Into<PathBuf>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            history_path: history_path.into(),
            settings_path: settings_path.into(),
        }
    }

    /// Standard file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILE_NAME), dir.join(SETTINGS_FILE_NAME))
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Save the history, logging (not returning) any failure
    pub fn save_history(&self, entries: &[Entry]) {
        if let Err(e) = self.try_save_history(entries) {
            warn!(
                path = %self.history_path.display(),
                error = %e,
                "Failed to save clipboard history"
            );
        }
    }

    pub fn try_save_history(&self, entries: &[Entry]) -> Result<()> {
        let bytes = encode_history(entries);
        write_atomic(&self.history_path, &bytes)?;
        debug!(
            path = %self.history_path.display(),
            entries = entries.len(),
            bytes = bytes.len(),
            "Saved clipboard history"
        );
        Ok(())
    }

    /// Load the history. A missing or unreadable file yields an empty history.
    pub fn load_history(&self) -> Vec<Entry> {
        let bytes = match fs::read(&self.history_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.history_path.display(), "No history file yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    path = %self.history_path.display(),
                    error = %e,
                    "Failed to read history file, starting empty"
                );
                return Vec::new();
            }
        };

        match decode_history(&bytes) {
            Ok(entries) => {
                info!(entries = entries.len(), "Loaded clipboard history");
                entries
            }
            Err(e) => {
                warn!(
                    path = %self.history_path.display(),
                    error = format!("{:#}", e),
                    "History file is corrupt, starting empty"
                );
                Vec::new()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) {
        self.try_save_settings(settings).warn_on_err();
    }

    pub fn try_save_settings(&self, settings: &Settings) -> Result<()> {
        write_atomic(&self.settings_path, &encode_settings(settings))
    }

    /// Load settings. A missing or unreadable file yields defaults.
    pub fn load_settings(&self) -> Settings {
        let bytes = match fs::read(&self.settings_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.settings_path.display(), error = %e, "Failed to read settings");
                }
                return Settings::default();
            }
        };
        decode_settings(&bytes).unwrap_or_else(|e| {
            warn!(error = format!("{:#}", e), "Settings file is corrupt, using defaults");
            Settings::default()
        })
    }
}

/// Atomic write: temp file then rename
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}
