//! Model gateway: admission control, timeouts and retries around a backend
//!
//! Every model call in a run goes through one [`ModelGateway`]. A call is a
//! sequence of attempts; each attempt takes a semaphore permit, runs the
//! backend request under a timeout and parses the answer. Failed attempts
//! are retried after a randomized exponential backoff, with the permit
//! released while sleeping. When attempts run out the caller gets
//! [`CallOutcome::Exhausted`] instead of an error.

use crate::config::GatewayConfig;
use crate::parser::parse_items;
use needle_domain::{ChatBackend, ChatMessage, CompletionRequest, Record, RecordSchema, ResponseFormat};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Result of a single attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// The backend answered and the answer parsed
    Success(T),
    /// Transport failure, timeout or malformed answer
    Retryable(String),
}

/// Result of a whole call, after retries
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// One attempt succeeded
    Success(T),
    /// Every attempt failed
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Reason the final attempt failed
        last_error: String,
    },
}

impl<T> CallOutcome<T> {
    /// Success value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            CallOutcome::Success(value) => Some(value),
            CallOutcome::Exhausted { .. } => None,
        }
    }

    /// Whether the call ran out of attempts
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CallOutcome::Exhausted { .. })
    }
}

/// Shared entry point for every model call in a run
pub struct ModelGateway<B> {
    backend: B,
    permits: Arc<Semaphore>,
    config: GatewayConfig,
}

impl<B: ChatBackend> ModelGateway<B> {
    /// Create a gateway admitting at most `config.max_concurrency` calls at once
    pub fn new(backend: B, config: GatewayConfig) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            config,
        }
    }

    /// Gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Permits not currently held by an attempt
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Model used for extraction calls
    pub fn extraction_model(&self) -> &str {
        self.config
            .extraction_model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// Model used for verification calls
    pub fn verification_model(&self) -> &str {
        self.config
            .verification_model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// Structured extraction call returning schema-shaped records
    ///
    /// A response that does not parse as an item list counts as a failed
    /// attempt and is retried like a transport error.
    pub async fn extract_records(
        &self,
        messages: Vec<ChatMessage>,
        schema: &RecordSchema,
    ) -> CallOutcome<Vec<Record>> {
        let request = CompletionRequest {
            model: self.extraction_model().to_string(),
            messages,
            temperature: self.config.extraction_temperature,
            max_tokens: None,
            response_format: ResponseFormat::JsonSchema {
                name: schema.list_name(),
                schema: schema.list_json_schema(),
            },
        };

        self.call_with_retry(&request, |text| {
            parse_items(schema, &text).map_err(|e| e.to_string())
        })
        .await
    }

    /// Free-text call, used for verification
    pub async fn complete_text(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> CallOutcome<String> {
        let request = CompletionRequest {
            model: self.verification_model().to_string(),
            messages,
            temperature: self.config.verification_temperature,
            max_tokens,
            response_format: ResponseFormat::Text,
        };

        self.call_with_retry(&request, |text| Ok(text)).await
    }

    /// One admitted, time-boxed request plus parsing
    async fn attempt<T, F>(&self, request: &CompletionRequest, parse: &F) -> Attempt<T>
    where
        F: Fn(String) -> Result<T, String> + Sync,
    {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Attempt::Retryable("admission semaphore closed".to_string()),
        };

        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.backend.complete(request)).await {
            Err(_) => Attempt::Retryable(format!("timed out after {:?}", timeout)),
            Ok(Err(e)) => Attempt::Retryable(e.to_string()),
            Ok(Ok(text)) => match parse(text) {
                Ok(value) => Attempt::Success(value),
                Err(e) => Attempt::Retryable(format!("malformed response: {}", e)),
            },
        }
    }

    async fn call_with_retry<T, F>(&self, request: &CompletionRequest, parse: F) -> CallOutcome<T>
    where
        F: Fn(String) -> Result<T, String> + Sync,
    {
        let policy = &self.config.retry;
        let mut attempt = 1;

        loop {
            match self.attempt(request, &parse).await {
                Attempt::Success(value) => {
                    if attempt > 1 {
                        debug!("Model call succeeded on attempt {}", attempt);
                    }
                    return CallOutcome::Success(value);
                }
                Attempt::Retryable(reason) => {
                    if attempt >= policy.max_attempts {
                        error!(
                            "Model call failed after {} attempts: {}",
                            attempt, reason
                        );
                        return CallOutcome::Exhausted {
                            attempts: attempt,
                            last_error: reason,
                        };
                    }

                    let delay = policy.delay_for_attempt(attempt, &mut rand::thread_rng());
                    warn!(
                        "Model call attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, policy.max_attempts, reason, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
