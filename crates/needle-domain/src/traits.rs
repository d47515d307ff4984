//! Trait definitions for external interactions
//!
//! The extraction pipeline talks to a language model only through
//! [`ChatBackend`]. Concrete backends live in `needle-llm`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions
    System,
    /// Input
    User,
    /// Model output
    Assistant,
}

/// A role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// How the model should shape its answer
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free text
    Text,
    /// JSON conforming to `schema`
    JsonSchema {
        /// Schema name reported to the backend
        name: String,
        /// JSON Schema document
        schema: Value,
    },
}

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f64,
    /// Completion token cap
    pub max_tokens: Option<u32>,
    /// Answer shape
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Text of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A chat-completion backend
///
/// Implemented by the infrastructure layer (needle-llm). Implementations
/// make exactly one request per call; retries, timeouts and admission
/// control belong to the caller.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Error type for backend operations
    type Error: std::fmt::Display + Send;

    /// Model identifier used when a request does not name one
    fn default_model(&self) -> &str;

    /// Run one completion and return the raw text content of the answer
    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error>;
}
