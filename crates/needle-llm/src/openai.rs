//! OpenAI Provider Implementation
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. Structured
//! requests use `response_format: json_schema` in strict mode, so the
//! answer content is a JSON document matching the requested schema.
//!
//! # Examples
//!
//! ```no_run
//! use needle_llm::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env("OPENAI_API_KEY", "gpt-4o-2024-08-06").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use needle_domain::{ChatBackend, ChatMessage, CompletionRequest, ResponseFormat};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Default OpenAI API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    response_format: Value,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider against the public OpenAI endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a provider reading the API key from `var`
    pub fn from_env(var: &str, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key =
            std::env::var(var).map_err(|_| LlmError::MissingApiKey(var.to_string()))?;
        Ok(Self::new(api_key, model))
    }

    /// Point at a different OpenAI-compatible endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn response_format(format: &ResponseFormat) -> Value {
        match format {
            ResponseFormat::Text => json!({ "type": "text" }),
            ResponseFormat::JsonSchema { name, schema } => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": true
                }
            }),
        }
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        ChatCompletionRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            response_format: Self::response_format(&request.response_format),
        }
    }

    /// Pull the answer text out of a decoded response
    fn content_of(response: ChatCompletionResponse) -> Result<String, LlmError> {
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(LlmError::InvalidResponse(format!("Model refused: {}", refusal)));
        }
        message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("Empty message content".to_string()))
    }
}

#[async_trait]
impl ChatBackend for OpenAiProvider {
    type Error = LlmError;

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = self.build_body(request);
        debug!("POST {} model={} messages={}", url, body.model, body.messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(body.model.to_string()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
        }

        let decoded = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Self::content_of(decoded)
    }
}
