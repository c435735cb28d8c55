//! Gemini Conversation Client
//!
//! Talks to Google's Generative Language API. The service is stateless, so
//! every call replays the whole session history followed by the new user
//! message.
//!
//! # Endpoint
//!
//! `POST {base_url}/v1beta/models/{model}:generateContent?key={api_key}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::{ConversationClient, ExchangeError};
use crate::config::ConversationConfig;
use crate::session::{ChatRole, Session};

/// Default service root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    message: String,
}

impl Content {
    fn text(role: Option<&'static str>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Model => "model",
    }
}

impl GenerateContentResponse {
    /// Concatenate every text part of the first candidate
    fn into_text(self) -> Result<String, ExchangeError> {
        if let Some(err) = self.error {
            return Err(ExchangeError::Api {
                status: err.code,
                message: err.message,
            });
        }

        let text: String = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(ExchangeError::EmptyReply)
        } else {
            Ok(text)
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Gemini chat client
#[derive(Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    system_instruction: Option<String>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client; a missing key makes every exchange fail
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_instruction: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create from the `[conversation]` configuration section
    #[must_use]
    pub fn from_config(config: &ConversationConfig) -> Self {
        let mut client = Self::new(config.api_key.clone(), config.model.clone())
            .with_base_url(config.base_url.clone());
        client.system_instruction = config.system_instruction.clone();
        client
    }

    /// Point the client at another service root (used by tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a system instruction sent with every request
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Model in use
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn generate_url(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/{}:generateContent?key={api_key}",
            self.base_url,
            self.model_path()
        )
    }

    fn build_request(&self, session: &Session, text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = session
            .history()
            .iter()
            .map(|m| Content::text(Some(role_name(m.role)), &m.text))
            .collect();
        contents.push(Content::text(Some("user"), text));

        GenerateContentRequest {
            contents,
            system_instruction: self
                .system_instruction
                .as_deref()
                .map(|s| Content::text(None, s)),
        }
    }
}

#[async_trait]
impl ConversationClient for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn exchange(&self, session: &Session, text: &str) -> Result<String, ExchangeError> {
        let api_key = self.api_key.as_deref().ok_or(ExchangeError::MissingApiKey)?;
        let request = self.build_request(session, text);

        tracing::debug!(
            model = %self.model,
            history = request.contents.len() - 1,
            "Sending generateContent request"
        );

        let response = self
            .http_client
            .post(self.generate_url(api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GenerateContentResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map_or(body, |e| e.message);
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<GenerateContentResponse>().await?.into_text()
    }
}
