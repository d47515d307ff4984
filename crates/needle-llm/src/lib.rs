//! Needle LLM Provider Layer
//!
//! Pluggable chat backends behind the `ChatBackend` trait from `needle-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OpenAiProvider`: OpenAI-compatible chat completions with structured output
//! - `OllamaProvider`: Local Ollama chat API
//!
//! Backends make exactly one HTTP request per call. Retries, timeouts and
//! admission control are the caller's job (see `needle-extractor`'s gateway).
//!
//! # Examples
//!
//! ```
//! use needle_domain::{ChatBackend, ChatMessage, CompletionRequest, ResponseFormat};
//! use needle_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let request = CompletionRequest {
//!     model: "mock".to_string(),
//!     messages: vec![ChatMessage::user("test prompt")],
//!     temperature: 0.0,
//!     max_tokens: None,
//!     response_format: ResponseFormat::Text,
//! };
//! assert_eq!(provider.complete(&request).await.unwrap(), "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use needle_domain::{ChatBackend, CompletionRequest};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// API key environment variable is unset
    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// What the mock does when a rule matches
#[derive(Debug, Clone)]
enum MockReply {
    Respond(String),
    Fail,
    /// Fail this many more times, then respond
    Flaky { failures_left: usize, response: String },
    /// Sleep, then respond
    Stall { delay: Duration, response: String },
}

#[derive(Debug, Clone)]
struct MockRule {
    pattern: String,
    reply: MockReply,
}

/// Mock LLM provider for deterministic testing
///
/// Rules match when the last user message of a request contains the rule's
/// pattern; the first matching rule wins, otherwise the default response is
/// returned. No network calls are made.
///
/// # Examples
///
/// ```
/// use needle_domain::{ChatBackend, ChatMessage, CompletionRequest, ResponseFormat};
/// use needle_llm::MockProvider;
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::default();
/// provider.add_response("chunk one", r#"{"items": []}"#);
/// provider.add_error("chunk two");
///
/// let request = |text: &str| CompletionRequest {
///     model: "mock".to_string(),
///     messages: vec![ChatMessage::user(text)],
///     temperature: 0.0,
///     max_tokens: None,
///     response_format: ResponseFormat::Text,
/// };
///
/// assert_eq!(provider.complete(&request("chunk one")).await.unwrap(), r#"{"items": []}"#);
/// assert!(provider.complete(&request("chunk two")).await.is_err());
/// assert_eq!(provider.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    rules: Arc<Mutex<Vec<MockRule>>>,
    call_count: Arc<Mutex<usize>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push_rule(&mut self, pattern: impl Into<String>, reply: MockReply) {
        lock(&self.rules).push(MockRule {
            pattern: pattern.into(),
            reply,
        });
    }

    /// Respond with `response` when the user message contains `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.push_rule(pattern, MockReply::Respond(response.into()));
    }

    /// Fail every request whose user message contains `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        self.push_rule(pattern, MockReply::Fail);
    }

    /// Fail the first `failures` matching requests, then respond
    pub fn add_flaky(
        &mut self,
        pattern: impl Into<String>,
        failures: usize,
        response: impl Into<String>,
    ) {
        self.push_rule(
            pattern,
            MockReply::Flaky {
                failures_left: failures,
                response: response.into(),
            },
        );
    }

    /// Sleep for `delay` before responding to matching requests
    pub fn add_stall(
        &mut self,
        pattern: impl Into<String>,
        delay: Duration,
        response: impl Into<String>,
    ) {
        self.push_rule(
            pattern,
            MockReply::Stall {
                delay,
                response: response.into(),
            },
        );
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Number of calls whose user message contained `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.last_user_message().is_some_and(|m| m.contains(pattern)))
            .count()
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Reset the call count and request log
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
        lock(&self.requests).clear();
    }

    /// Pick the reply for a request, advancing flaky counters
    fn reply_for(&self, request: &CompletionRequest) -> MockReply {
        let text = request.last_user_message().unwrap_or_default();
        let mut rules = lock(&self.rules);
        let Some(rule) = rules.iter_mut().find(|r| text.contains(&r.pattern)) else {
            return MockReply::Respond(self.default_response.clone());
        };

        match &mut rule.reply {
            MockReply::Flaky {
                failures_left,
                response,
            } => {
                if *failures_left > 0 {
                    *failures_left -= 1;
                    MockReply::Fail
                } else {
                    MockReply::Respond(response.clone())
                }
            }
            other => other.clone(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl ChatBackend for MockProvider {
    type Error = LlmError;

    fn default_model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        *lock(&self.call_count) += 1;
        lock(&self.requests).push(request.clone());

        match self.reply_for(request) {
            MockReply::Respond(response) => Ok(response),
            MockReply::Stall { delay, response } => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            MockReply::Fail | MockReply::Flaky { .. } => {
                Err(LlmError::Other("Mock error".to_string()))
            }
        }
    }
}
