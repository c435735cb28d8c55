//! Session Management
//!
//! One [`Session`] per application run. It mirrors the remote chat history so
//! the conversation client can replay it on each exchange. The controller
//! never touches the history; it only hands the session to the client.
//!
//! History is append-only and only grows after a successful exchange: a
//! failed call leaves no half-finished turn behind.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::messages::SessionId;

/// Who said something
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person typing
    User,
    /// The conversation service
    Model,
}

/// One entry in the conversation history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: ChatRole,
    /// Message text
    pub text: String,
}

impl ChatMessage {
    /// A user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// A model reply
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// A conversation with the remote service
///
/// Shared as `Arc<Session>` between the controller and the exchange tasks.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    history: Mutex<Vec<ChatMessage>>,
}

impl Session {
    /// Start a fresh conversation
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Copy of the history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }

    /// Number of recorded messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Whether nothing has been said yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Record a completed exchange
    ///
    /// Both halves go in under one lock so readers never see a user message
    /// without its reply.
    pub fn record_exchange(&self, user: impl Into<String>, reply: impl Into<String>) {
        let mut history = self.history.lock();
        history.push(ChatMessage::user(user));
        history.push(ChatMessage::model(reply));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.id().0.len(), 36);
    }

    #[test]
    fn test_record_exchange_appends_pair() {
        let session = Session::new();
        session.record_exchange("Hello", "Hi there!");
        session.record_exchange("How are you?", "Great.");

        assert_eq!(session.len(), 4);
        assert_eq!(
            session.history(),
            vec![
                ChatMessage::user("Hello"),
                ChatMessage::model("Hi there!"),
                ChatMessage::user("How are you?"),
                ChatMessage::model("Great."),
            ]
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::Model).unwrap(), "\"model\"");
    }
}
