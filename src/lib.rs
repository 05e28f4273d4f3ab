//! clipstack - clipboard history engine
//!
//! Records every clipboard change as a multi-format entry, keeps a bounded
//! history that survives restarts and replays entries back onto the
//! clipboard or into the focused application.

pub mod clipboard_history;
pub mod config;
pub mod error;
pub mod logging;
