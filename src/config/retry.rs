//! Retry policy configuration

use crate::retry::{RetryPolicy, DEFAULT_RETRYABLE_SIGNATURES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff curve for one call site, in TOML-friendly units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub retryable_signatures: Vec<String>,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            retryable_signatures: DEFAULT_RETRYABLE_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
            retryable_signatures: config.retryable_signatures.clone(),
        }
    }
}

/// Retry policies per call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Buffered chat completions.
    pub chat: RetryPolicyConfig,
    /// Prompt improvement.
    pub improve: RetryPolicyConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            chat: RetryPolicyConfig::default(),
            improve: RetryPolicyConfig {
                max_retries: 2,
                ..RetryPolicyConfig::default()
            },
        }
    }
}
