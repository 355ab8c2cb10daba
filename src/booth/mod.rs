//! Recording session state machine
//!
//! The booth cycles Idle -> Recording -> Review -> Idle, with a timeout
//! detour through TimeoutWarning when a recording runs too long.

pub mod controller;
pub mod events;
pub mod input;
pub mod state;

#[cfg(test)]
mod testing;

pub use controller::{format_elapsed, Booth, Collaborators};
pub use events::{BoothEvent, Flow};
pub use input::{dispatch, BoothInput, Key, KeyPress, Modifiers};
pub use state::{BoothConfig, PresenterKind, SessionState, StatusStyle, View};
