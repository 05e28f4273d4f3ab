//! Engine settings record
//!
//! Small binary record: saved window position, theme, first-run flag.
//! Fields after the position are optional on disk so older files still load.

use anyhow::{Context, Result};
use tracing::debug;

use super::persistence::{ByteReader, ByteWriter};

/// Stored in place of a position when none has been saved
const NO_POSITION: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    fn to_tag(self) -> u8 {
        match self {
            Theme::Dark => 0,
            Theme::Light => 1,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            1 => Theme::Light,
            0 => Theme::Dark,
            other => {
                debug!(tag = other, "Unknown theme tag, using dark");
                Theme::Dark
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub window_position: Option<WindowPosition>,
    pub theme: Theme,
    pub first_run: bool,
}

impl Default for Settings {
    /// Settings for a fresh install
    fn default() -> Self {
        Self {
            window_position: None,
            theme: Theme::Dark,
            first_run: true,
        }
    }
}

pub fn encode_settings(settings: &Settings) -> Vec<u8> {
    let mut w = ByteWriter::new();
    let (x, y) = settings
        .window_position
        .map(|p| (p.x, p.y))
        .unwrap_or((NO_POSITION, NO_POSITION));
    w.put_i32(x);
    w.put_i32(y);
    w.put_u8(settings.theme.to_tag());
    w.put_u8(settings.first_run as u8);
    w.into_inner()
}

/// Decode a settings record. Missing trailing fields take their defaults:
/// dark theme, and `first_run = false` (the file exists, so this is not a
/// first run).
pub fn decode_settings(bytes: &[u8]) -> Result<Settings> {
    let mut r = ByteReader::new(bytes);
    let x = r.i32().context("settings: window x")?;
    let y = r.i32().context("settings: window y")?;

    let window_position = if x == NO_POSITION && y == NO_POSITION {
        None
    } else {
        Some(WindowPosition { x, y })
    };
    let theme = if r.is_empty() {
        Theme::default()
    } else {
        Theme::from_tag(r.u8()?)
    };
    let first_run = if r.is_empty() { false } else { r.u8()? != 0 };

    Ok(Settings {
        window_position,
        theme,
        first_run,
    })
}
