//! Randomized exponential backoff

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for model calls
///
/// The wait before retry `n` is drawn uniformly from
/// `[min_backoff, ceiling(n)]`, where `ceiling(n) = base_backoff · 2^(n-1)`
/// clamped to `[min_backoff, max_backoff]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Lower bound of every wait (milliseconds)
    pub min_backoff_ms: u64,

    /// Upper bound of every wait (milliseconds)
    pub max_backoff_ms: u64,

    /// Growth base: the unclamped ceiling before retry `n` is `base · 2^(n-1)` (milliseconds)
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff_ms: 4_000,
            max_backoff_ms: 60_000,
            base_backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Upper bound of the wait that follows failed attempt `attempt` (1-based)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let grown = self.base_backoff_ms.saturating_mul(1u64 << exponent);
        let clamped = grown.min(self.max_backoff_ms).max(self.min_backoff_ms);
        Duration::from_millis(clamped)
    }

    /// Random wait following failed attempt `attempt` (1-based)
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_millis() as u64;
        let floor = self.min_backoff_ms.min(ceiling);
        Duration::from_millis(rng.gen_range(floor..=ceiling))
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".to_string());
        }
        if self.min_backoff_ms > self.max_backoff_ms {
            return Err("retry.min_backoff_ms cannot exceed retry.max_backoff_ms".to_string());
        }
        Ok(())
    }
}
