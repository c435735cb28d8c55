//! Conductor Messages
//!
//! Messages sent from the turn controller to the UI surface. The surface is a
//! pure renderer: it clears its input box, shows responses and status text,
//! and repaints the avatar when told to.
//!
//! Messages are delivered over an unbounded channel in the order the
//! controller produced them, so a surface can replay them verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::avatar::Mood;

/// Messages from the controller to the UI surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorMessage {
    /// The input field should be emptied (a turn was accepted)
    ClearInput,

    /// Replace the response box contents with this text
    Response {
        /// Text to display (a reply, the fallback message, or the greeting)
        text: String,
    },

    /// Replace the status bar text
    Status {
        /// Status line text
        text: String,
    },

    /// The avatar's mood changed
    Mood {
        /// The new mood
        mood: Mood,
    },

    /// The controller is shutting down
    Quit,
}

impl ConductorMessage {
    /// Build a response message
    pub fn response(text: impl Into<String>) -> Self {
        Self::Response { text: text.into() }
    }

    /// Build a status message
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }
}

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one accepted user turn
///
/// Turn IDs increase monotonically for the lifetime of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_eq!(a.0.len(), 36);
    }

    #[test]
    fn test_turn_id_ordering_and_display() {
        assert!(TurnId(2) > TurnId(1));
        assert_eq!(TurnId(7).to_string(), "turn-7");
    }

    #[test]
    fn test_message_builders() {
        assert_eq!(
            ConductorMessage::response("hi"),
            ConductorMessage::Response {
                text: "hi".to_string()
            }
        );
        assert_eq!(
            ConductorMessage::status("Ready."),
            ConductorMessage::Status {
                text: "Ready.".to_string()
            }
        );
    }

    #[test]
    fn test_message_serialization() {
        let msg = ConductorMessage::Mood { mood: Mood::Thinking };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ConductorMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
