//! Conversation Client Traits
//!
//! The controller talks to the remote chat service through
//! [`ConversationClient`]. One call is one request/response pair against the
//! session's history. Implementations own the wire protocol and credentials;
//! the controller treats every failure the same way.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Session;

/// Why an exchange produced no reply
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// No API key was configured
    #[error("no API key configured for the conversation service")]
    MissingApiKey,

    /// The request never completed
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error
    #[error("service returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error text from the service
        message: String,
    },

    /// The service answered but said nothing
    #[error("service returned an empty reply")]
    EmptyReply,
}

/// Remote conversation capability
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Client name for logs (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Send `text` as the next user message and return the reply
    ///
    /// `session` supplies the history to replay and is never modified here;
    /// the controller records the exchange once the reply is delivered.
    async fn exchange(&self, session: &Session, text: &str) -> Result<String, ExchangeError>;
}
