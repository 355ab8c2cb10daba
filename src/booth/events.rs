//! Booth event queue items

use crate::booth::input::KeyPress;
use crate::timer::Tick;

/// Everything the booth reacts to arrives as one of these
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoothEvent {
    /// Raw key press from the input surface
    Key(KeyPress),
    /// Timer expiration
    Tick(Tick),
    /// Review playback reached the end of the clip
    PlaybackFinished,
    /// Process-level shutdown request (e.g. SIGINT)
    Shutdown,
}

/// What the event loop should do after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}
