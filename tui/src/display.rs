//! Display State
//!
//! What the window currently shows, derived from `ConductorMessage`s. The
//! TUI is a thin client: it keeps the input line the user is editing and
//! otherwise renders exactly what the controller told it to.

use milo_conductor::{ConductorMessage, Mood};

/// Everything the window renders apart from the avatar geometry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Text in the input box
    pub input: String,
    /// Text in the response box
    pub response: String,
    /// Status bar text
    pub status: String,
    /// Last mood reported by the controller
    pub mood: Mood,
    /// The controller asked the window to close
    pub quit: bool,
}

impl DisplayState {
    /// Fresh window state
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: "Ready.".to_string(),
            ..Self::default()
        }
    }

    /// Apply one controller message
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            ConductorMessage::ClearInput => self.input.clear(),
            ConductorMessage::Response { text } => self.response = text,
            ConductorMessage::Status { text } => self.status = text,
            ConductorMessage::Mood { mood } => self.mood = mood,
            ConductorMessage::Quit => self.quit = true,
        }
    }

    /// Type a character into the input box
    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    /// Delete the last character of the input box
    pub fn backspace(&mut self) {
        self.input.pop();
    }
}
