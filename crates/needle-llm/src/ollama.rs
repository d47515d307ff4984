//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local chat API for running extraction
//! against local models.
//!
//! # Features
//!
//! - Async HTTP communication with the `/api/chat` endpoint
//! - Structured output through Ollama's `format` JSON Schema support
//! - Configurable endpoint and model
//!
//! # Examples
//!
//! ```no_run
//! use needle_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! ```

use crate::LlmError;
use async_trait::async_trait;
use needle_domain::{ChatBackend, ChatMessage, CompletionRequest, ResponseFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

/// Request body for Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from Ollama chat API
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a new Ollama provider on `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> OllamaChatRequest<'a> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        let format = match &request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonSchema { schema, .. } => Some(schema),
        };
        OllamaChatRequest {
            model,
            messages: &request.messages,
            stream: false,
            format,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaProvider {
    type Error = LlmError;

    fn default_model(&self) -> &str {
        &self.model
    }

    /// Run one chat completion
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - Model is not available
    /// - Network communication fails
    /// - Response format is invalid
    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = self.build_body(request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(body.model.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json::<OllamaChatResponse>()
            .await
            .map(|r| r.message.content)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}
