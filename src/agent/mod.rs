//! Provider abstraction layer.
//!
//! This module provides the `ChatProvider` trait that hides the wire format
//! of each hosted model API (Anthropic Messages, Google Gemini, xAI) behind
//! two operations: a buffered completion and a stream of text deltas.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod google;
pub mod sse;
pub mod types;
pub mod xai;

pub use error::AgentError;
pub use factory::{create_provider, ProviderSet};
pub use types::{ChatMessage, Completion, ProviderRequest, Role, Usage};

use crate::config::ProviderKind;

/// Incremental assistant text, in provider arrival order.
pub type TextStream = BoxStream<'static, Result<String, AgentError>>;

/// Unified interface for the hosted chat providers.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn ChatProvider>`.
///
/// # Cancellation Safety
///
/// Dropping a returned future or [`TextStream`] aborts the in-flight HTTP
/// request and releases the connection.
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Which provider family this is.
    fn kind(&self) -> ProviderKind;

    /// Identifier used in logs (e.g., "anthropic").
    fn id(&self) -> &str;

    /// Send one request and wait for the complete response.
    ///
    /// Takes the request by reference so callers can retry it unchanged.
    async fn chat_completion(&self, request: &ProviderRequest) -> Result<Completion, AgentError>;

    /// Send one request in streaming mode.
    ///
    /// Returns once the provider has accepted the request; HTTP-level
    /// failures are reported here rather than as the first stream item.
    async fn chat_completion_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<TextStream, AgentError>;
}

/// Build an [`AgentError::Upstream`] from a non-2xx response body.
///
/// Providers wrap errors as `{"error": {"type"|"status": .., "message": ..}}`
/// or `{"error": ".."}`; the kind and message are kept so failure
/// classification can match on them. Unrecognised bodies are kept verbatim.
pub(crate) fn upstream_error(status: u16, body: &str) -> AgentError {
    AgentError::Upstream {
        status,
        message: extract_error_message(body).unwrap_or_else(|| body.trim().to_string()),
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;

    if let Some(text) = error.as_str() {
        return Some(text.to_string());
    }

    let message = error.get("message").and_then(|m| m.as_str())?;
    let kind = error
        .get("type")
        .or_else(|| error.get("status"))
        .and_then(|t| t.as_str());

    Some(match kind {
        Some(kind) => format!("{}: {}", kind, message),
        None => message.to_string(),
    })
}
