//! Terminal key input
//!
//! A dedicated thread blocks on terminal events and forwards key presses to
//! the booth event queue.

use crate::booth::events::BoothEvent;
use crate::booth::input::{Key, KeyPress, Modifiers};
use crate::utils::{AppError, AppResult};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use std::io;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;

/// Keeps the terminal in raw mode while alive
pub struct TerminalGuard {
    enhanced: bool,
}

impl TerminalGuard {
    pub fn enter() -> AppResult<Self> {
        terminal::enable_raw_mode()
            .map_err(|e| AppError::Terminal(format!("Failed to enable raw mode: {}", e)))?;

        // Without enhancement most terminals cannot tell Ctrl+Shift+Q from Ctrl+Q
        let mut enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            let flags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES;
            if let Err(e) = execute!(io::stdout(), PushKeyboardEnhancementFlags(flags)) {
                tracing::warn!("Keyboard enhancement unavailable: {}", e);
                enhanced = false;
            }
        } else {
            tracing::warn!("Terminal does not report modifier-accurate keys");
        }

        Ok(Self { enhanced })
    }

    /// Whether key events carry every modifier, Shift included
    pub fn keyboard_enhanced(&self) -> bool {
        self.enhanced
    }

    /// The exit combination this terminal can actually deliver
    pub fn reachable_combo(&self, combo: KeyPress) -> KeyPress {
        if self.enhanced {
            combo
        } else {
            combo.legacy()
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

/// Convert a terminal key event; releases and repeats are dropped
pub fn key_press_from_crossterm(event: &KeyEvent) -> Option<KeyPress> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    let key = match event.code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        _ => Key::Other,
    };

    let modifiers = Modifiers {
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
        alt: event.modifiers.contains(KeyModifiers::ALT),
    };

    Some(KeyPress::new(key, modifiers))
}

/// Forward key presses until the queue closes or the terminal fails
pub fn spawn_key_reader(tx: UnboundedSender<BoothEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("booth-keys".to_string())
        .spawn(move || loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(press) = key_press_from_crossterm(&key) {
                        if tx.send(BoothEvent::Key(press)).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Key input failed: {}", e);
                    break;
                }
            }
        })
}
