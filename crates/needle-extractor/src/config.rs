//! Configuration for the Extractor

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the model gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Maximum number of model calls in flight at once
    pub max_concurrency: usize,

    /// Maximum time for a single model call attempt (seconds)
    pub request_timeout_secs: u64,

    /// Model for extraction calls (backend default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_model: Option<String>,

    /// Model for verification calls (backend default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_model: Option<String>,

    /// Sampling temperature for extraction calls
    pub extraction_temperature: f64,

    /// Sampling temperature for verification calls
    pub verification_temperature: f64,

    /// Backoff between failed attempts
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Get the per-attempt timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        self.retry.validate()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 300,
            request_timeout_secs: 120,
            extraction_model: None,
            verification_model: None,
            extraction_temperature: 0.6,
            verification_temperature: 0.4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Token budget per chunk
    pub max_chunk_tokens: usize,

    /// Minimum share of populated fields a record needs to be kept
    pub populated_threshold: f64,

    /// Paragraphs of context on each side of a match during verification
    pub context_paragraphs: usize,

    /// Model gateway settings
    pub gateway: GatewayConfig,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_tokens == 0 {
            return Err("max_chunk_tokens must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.populated_threshold) {
            return Err(format!(
                "populated_threshold {} out of range [0.0, 1.0]",
                self.populated_threshold
            ));
        }
        self.gateway.validate()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 32_000,
            populated_threshold: 0.5,
            context_paragraphs: 3,
            gateway: GatewayConfig::default(),
        }
    }
}
