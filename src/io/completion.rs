//! Chat-completion client for the Groq OpenAI-compatible endpoint.
//!
//! The [`CompletionClient`] trait decouples the generator and reviewer from
//! the actual HTTP backend. Tests use scripted clients that return
//! predetermined completions without touching the network.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Base URL for the Groq chat-completions API.
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// A role-tagged message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Parameters for one completion call. The model is fixed per client.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Error taxonomy for completion calls.
///
/// Callers digest these locally (placeholder candidate, heuristic fallback);
/// they never cross a component boundary.
#[derive(Debug)]
pub enum CompletionError {
    /// Network or connection error.
    Network(String),
    /// API returned a non-success status.
    Api { status: u16, message: String },
    /// Failed to parse the response body.
    Parse(String),
    /// Rate limited (HTTP 429).
    RateLimited,
    /// Authentication failed (HTTP 401).
    AuthenticationFailed,
    /// Response carried no usable completion text.
    Empty,
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {e}"),
            Self::Api { status, message } => write!(f, "API error ({status}): {message}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::Empty => write!(f, "no completion text in response"),
        }
    }
}

impl std::error::Error for CompletionError {}

/// Abstraction over completion backends.
pub trait CompletionClient {
    /// Request one completion and return its text.
    fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError>;
}

/// Client for the Groq chat-completions API.
pub struct GroqClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

impl CompletionClient for GroqClient {
    #[instrument(skip_all, fields(model = %self.model, temperature = request.temperature))]
    fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError> {
        let wire = WireRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{GROQ_BASE_URL}/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&wire)
            .send()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            warn!(status, "completion request failed");
            let message = response.text().unwrap_or_default();
            return Err(match status {
                429 => CompletionError::RateLimited,
                401 => CompletionError::AuthenticationFailed,
                _ => CompletionError::Api { status, message },
            });
        }

        let body: WireResponse = response
            .json()
            .map_err(|e| CompletionError::Parse(e.to_string()))?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::Empty)?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
