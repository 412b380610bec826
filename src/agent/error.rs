//! Error types for provider operations.

use thiserror::Error;

/// Errors that can occur while talking to a hosted model provider.
///
/// The rendered message is what retry classification and the failure
/// taxonomy inspect, so upstream status codes are kept in the text.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, reset, ...).
    #[error("Network error: connection failed: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Provider returned an error response (4xx, 5xx).
    #[error("Provider error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Provider reported an error inside an otherwise successful stream.
    #[error("Provider stream error: {0}")]
    Stream(String),

    /// Provider response doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Map a reqwest transport error, preserving timeouts.
    pub(crate) fn from_transport(e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            AgentError::Timeout(timeout_ms)
        } else {
            AgentError::Network(e.without_url().to_string())
        }
    }
}
