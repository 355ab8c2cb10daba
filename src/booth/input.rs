//! Key input dispatch
//!
//! Maps raw key presses to booth inputs. Which keys mean something depends on
//! the current state; anything else is ignored. The operator exit combination
//! is checked first and is honored in every state.

use crate::booth::state::SessionState;

/// Key identity, independent of the input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    Escape,
    Char(char),
    Other,
}

/// Modifier flags held during a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Key press without modifiers
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Letter keys compare case-insensitively; modifiers must match exactly
    pub fn matches(&self, other: &KeyPress) -> bool {
        let same_key = match (self.key, other.key) {
            (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        };
        same_key && self.modifiers == other.modifiers
    }

    /// The combination as seen by terminals without keyboard enhancement
    ///
    /// Those report Ctrl+Shift+letter as Ctrl+letter, so Shift is dropped
    /// whenever Ctrl is held.
    pub fn legacy(&self) -> KeyPress {
        if !self.modifiers.ctrl {
            return *self;
        }
        KeyPress::new(
            self.key,
            Modifiers {
                shift: false,
                ..self.modifiers
            },
        )
    }
}

/// Booth-level meaning of a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothInput {
    /// Start a recording (Idle)
    Start,
    /// Stop the recording (Recording)
    Stop,
    /// Keep a timed-out recording (TimeoutWarning)
    Keep,
    /// Accept the reviewed clip (Review)
    Accept,
    /// Reject the reviewed clip (Review)
    Reject,
    /// Operator exit
    Exit,
}

/// Translate a key press for the given state
pub fn dispatch(
    state: SessionState,
    press: &KeyPress,
    exit_combo: &KeyPress,
) -> Option<BoothInput> {
    if press.matches(exit_combo) {
        return Some(BoothInput::Exit);
    }

    match (state, press.key) {
        (SessionState::Idle, Key::Space) => Some(BoothInput::Start),
        (SessionState::Recording, Key::Space) => Some(BoothInput::Stop),
        (SessionState::TimeoutWarning, Key::Char(c)) if c.eq_ignore_ascii_case(&'a') => {
            Some(BoothInput::Keep)
        }
        (SessionState::Review, Key::Enter) => Some(BoothInput::Accept),
        (SessionState::Review, Key::Escape) => Some(BoothInput::Reject),
        _ => None,
    }
}
