//! Conversation Backend Integration
//!
//! Access to the remote chat service through a common trait, so the
//! controller can be driven by Gemini in production and by a scripted client
//! in tests.
//!
//! # Usage
//!
//! ```ignore
//! use milo_conductor::backend::{ConversationClient, GeminiClient};
//! use milo_conductor::Session;
//!
//! let client = GeminiClient::new(Some(api_key), "gemini-2.0-flash");
//! let session = Session::new();
//! let reply = client.exchange(&session, "Hello!").await?;
//! ```

mod gemini;
mod traits;

pub use gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use traits::{ConversationClient, ExchangeError};
