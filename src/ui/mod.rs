//! Status line presentation and key input
//!
//! The booth core emits presentation directives through [`Presenter`]. Two
//! presenters exist: a colored terminal status line, and a JSON line stream
//! for an external UI process.

pub mod keys;

pub use keys::{key_press_from_crossterm, spawn_key_reader, TerminalGuard};

use crate::booth::state::{StatusStyle, View};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use serde::Serialize;
use std::io::Write;

/// Receives presentation directives from the booth
pub trait Presenter: Send {
    fn set_status_text(&mut self, text: &str);
    fn set_status_style(&mut self, style: StatusStyle);
    fn switch_view(&mut self, view: View);
}

/// One presentation directive, as sent to an external UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum UiDirective {
    StatusText { text: String },
    StatusStyle { style: StatusStyle },
    SwitchView { view: View },
}

/// Single status line on a terminal
pub struct ConsolePresenter<W: Write + Send> {
    out: W,
    text: String,
    style: StatusStyle,
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            text: String::new(),
            style: StatusStyle::Normal,
        }
    }

    fn colors(style: StatusStyle) -> (Color, Color) {
        match style {
            StatusStyle::Normal => (Color::White, Color::Reset),
            StatusStyle::Recording => (Color::Red, Color::Reset),
            StatusStyle::Warning => (Color::Red, Color::Black),
        }
    }

    fn render(&mut self) {
        let (fg, bg) = Self::colors(self.style);
        let result = queue!(
            self.out,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(fg),
            SetBackgroundColor(bg),
            Print(&self.text),
            ResetColor
        )
        .and_then(|_| self.out.flush());

        if let Err(e) = result {
            tracing::warn!("Failed to draw status line: {}", e);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn set_status_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.render();
    }

    fn set_status_style(&mut self, style: StatusStyle) {
        self.style = style;
        self.render();
    }

    fn switch_view(&mut self, view: View) {
        // The preview and playback windows are owned by the collaborators
        tracing::debug!("View switched to {:?}", view);
    }
}

/// Newline-delimited JSON directives
pub struct JsonPresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, directive: UiDirective) {
        let result = serde_json::to_writer(&mut self.out, &directive)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());

        if let Err(e) = result {
            tracing::warn!("Failed to emit {:?}: {}", directive, e);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for JsonPresenter<W> {
    fn set_status_text(&mut self, text: &str) {
        self.emit(UiDirective::StatusText {
            text: text.to_string(),
        });
    }

    fn set_status_style(&mut self, style: StatusStyle) {
        self.emit(UiDirective::StatusStyle { style });
    }

    fn switch_view(&mut self, view: View) {
        self.emit(UiDirective::SwitchView { view });
    }
}
