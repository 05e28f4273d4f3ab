//! Synthesized paste keystroke
//!
//! Sends modifier-down, V-down, V-up, modifier-up to whatever application
//! has input focus. On macOS the modifier is Command and events go through
//! Core Graphics; elsewhere the modifier is Control and events go through
//! `enigo` (SendInput on Windows, X11 on Linux).

use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Gap between key events so the target app sees distinct transitions
const KEY_EVENT_GAP: Duration = Duration::from_millis(5);

/// Emits a paste gesture into the focused application
pub trait KeystrokeInjector {
    fn send_paste(&mut self) -> Result<()>;
}

/// Injector backed by the host's input-injection facility
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeystrokeInjector;

impl KeystrokeInjector for SystemKeystrokeInjector {
    fn send_paste(&mut self) -> Result<()> {
        simulate_paste()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasteKey {
    /// Command on macOS, Control elsewhere
    Modifier,
    V,
}

const PASTE_SEQUENCE: [(PasteKey, bool); 4] = [
    (PasteKey::Modifier, true),
    (PasteKey::V, true),
    (PasteKey::V, false),
    (PasteKey::Modifier, false),
];

/// Drive the paste sequence through `send(key, down)`.
///
/// If a step fails after the modifier went down, the modifier is still
/// released so the user's keyboard is not left with it held.
fn run_paste_sequence(
    mut send: impl FnMut(PasteKey, bool) -> Result<()>,
    gap: Duration,
) -> Result<()> {
    let mut modifier_down = false;
    for (key, down) in PASTE_SEQUENCE {
        if let Err(e) = send(key, down) {
            if modifier_down {
                if let Err(release) = send(PasteKey::Modifier, false) {
                    warn!(error = %release, "Failed to release paste modifier");
                }
            }
            return Err(e);
        }
        if key == PasteKey::Modifier {
            modifier_down = down;
        }
        thread::sleep(gap);
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn simulate_paste() -> Result<()> {
    use anyhow::Context;
    use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    const KEY_COMMAND: CGKeyCode = 55;
    const KEY_V: CGKeyCode = 9;

    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .ok()
        .context("Failed to create CGEventSource")?;

    run_paste_sequence(
        |key, down| {
            let code = match key {
                PasteKey::Modifier => KEY_COMMAND,
                PasteKey::V => KEY_V,
            };
            let event = CGEvent::new_keyboard_event(source.clone(), code, down)
                .ok()
                .with_context(|| format!("Failed to create key event {} (down={})", code, down))?;
            // Release of Command carries no modifier flag
            if !(key == PasteKey::Modifier && !down) {
                event.set_flags(CGEventFlags::CGEventFlagCommand);
            }
            event.post(CGEventTapLocation::HID);
            Ok(())
        },
        KEY_EVENT_GAP,
    )?;

    debug!("Simulated Cmd+V via Core Graphics");
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn simulate_paste() -> Result<()> {
    use anyhow::anyhow;
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};

    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| anyhow!("Failed to connect to input injection: {}", e))?;

    run_paste_sequence(
        |key, down| {
            let key = match key {
                PasteKey::Modifier => Key::Control,
                PasteKey::V => Key::Unicode('v'),
            };
            let direction = if down {
                Direction::Press
            } else {
                Direction::Release
            };
            enigo
                .key(key, direction)
                .map_err(|e| anyhow!("Failed to send key event: {}", e))
        },
        KEY_EVENT_GAP,
    )?;

    debug!("Simulated Ctrl+V via enigo");
    Ok(())
}


#[cfg(all(test, feature = "system-tests"))]
mod system_tests {
    use super::*;

    #[test]
    fn test_send_paste_posts_events() {
        let mut injector = SystemKeystrokeInjector;
        injector.send_paste().expect("Should post key events");
    }
}
