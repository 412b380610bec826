//! Streaming response relay.
//!
//! Performs one "ask the model" operation against a [`ChatProvider`] in
//! one of two modes:
//!
//! - **Buffered**: wait for the complete response. Each attempt has a hard
//!   deadline and the whole call is wrapped in [`retry_with_backoff`].
//! - **Streaming**: forward text deltas as they arrive, then a single
//!   [`StreamChunk::Done`]. Never retried, since text already sent to the
//!   client cannot be taken back.
//!
//! Dropping the returned stream drops the provider stream with it, which
//! closes the upstream connection.

use crate::agent::{AgentError, ChatProvider, Completion, ProviderRequest};
use crate::api::error::{ApiError, ErrorKind};
use crate::retry::{retry_with_backoff, RetryPolicy};
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle of a single relayed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Init,
    Dispatched,
    Streaming,
    AwaitingResponse,
    Complete,
    Failed,
}

impl RelayState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: RelayState) -> bool {
        use RelayState::*;
        match (self, next) {
            (Complete | Failed, _) => false,
            (_, Failed) => true,
            (Init, Dispatched) => true,
            (Dispatched, Streaming | AwaitingResponse) => true,
            (Streaming | AwaitingResponse, Complete) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Complete | RelayState::Failed)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Init => "init",
            RelayState::Dispatched => "dispatched",
            RelayState::Streaming => "streaming",
            RelayState::AwaitingResponse => "awaiting_response",
            RelayState::Complete => "complete",
            RelayState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the state of one relayed request.
#[derive(Debug)]
struct StateTracker {
    provider: &'static str,
    state: RelayState,
}

impl StateTracker {
    fn new(provider: &'static str) -> Self {
        Self {
            provider,
            state: RelayState::Init,
        }
    }

    fn advance(&mut self, next: RelayState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal relay transition {} -> {}",
            self.state,
            next
        );
        debug!(provider = self.provider, from = %self.state, to = %next, "Relay state");
        self.state = next;
    }
}

/// A unit of output in streaming mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    Done,
}

impl StreamChunk {
    /// The `data:` payload for this chunk.
    pub fn to_sse_data(&self) -> String {
        match self {
            StreamChunk::Text(text) => json!({ "text": text }).to_string(),
            StreamChunk::Done => "[DONE]".to_string(),
        }
    }
}

/// Failures of a relayed request.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// The provider call failed (after retries, in buffered mode).
    #[error("{source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: AgentError,
    },
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Provider {
                source: AgentError::Timeout(_),
                ..
            } => ErrorKind::TimeoutError,
            RelayError::Provider { source, .. } => {
                ErrorKind::classify_provider_message(&source.to_string())
            }
        }
    }

    /// Client-facing envelope for this failure.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            RelayError::Provider {
                provider,
                source: source @ AgentError::Timeout(_),
            } => ApiError::new(
                ErrorKind::TimeoutError,
                format!("{} API request timed out. Please try again.", provider),
            )
            .with_details(source.to_string()),
            RelayError::Provider { provider, source } => {
                ApiError::provider_failure(provider, source.to_string())
            }
        }
    }

    /// Payload of the error event sent when a stream fails mid-way.
    pub fn to_sse_data(&self) -> String {
        let api = self.to_api_error();
        json!({ "error": api.error, "type": api.kind }).to_string()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        err.to_api_error()
    }
}

/// Stream of relayed chunks. Ends after `Done` or after the first error.
pub type RelayStream = BoxStream<'static, Result<StreamChunk, RelayError>>;

/// Drives a single provider call.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn ChatProvider>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl Relay {
    pub fn new(provider: Arc<dyn ChatProvider>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            provider,
            policy,
            attempt_timeout,
        }
    }

    fn label(&self) -> &'static str {
        self.provider.kind().display_name()
    }

    /// Buffered mode: one complete response, with retries.
    pub async fn complete(&self, request: &ProviderRequest) -> Result<Completion, RelayError> {
        let mut tracker = StateTracker::new(self.provider.kind().as_str());
        tracker.advance(RelayState::Dispatched);
        tracker.advance(RelayState::AwaitingResponse);

        let timeout_ms = self.attempt_timeout.as_millis() as u64;
        let provider = &self.provider;
        let result = retry_with_backoff(&self.policy, || async move {
            match tokio::time::timeout(self.attempt_timeout, provider.chat_completion(request)).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout(timeout_ms)),
            }
        })
        .await;

        match result {
            Ok(completion) => {
                tracker.advance(RelayState::Complete);
                Ok(completion)
            }
            Err(source) => {
                tracker.advance(RelayState::Failed);
                warn!(provider = provider.id(), error = %source, "Provider call failed");
                Err(RelayError::Provider {
                    provider: self.label(),
                    source,
                })
            }
        }
    }

    /// Streaming mode.
    ///
    /// Errors opening the stream are returned directly so the caller can
    /// still answer with a normal error response.
    pub async fn stream(&self, request: &ProviderRequest) -> Result<RelayStream, RelayError> {
        let mut tracker = StateTracker::new(self.provider.kind().as_str());
        tracker.advance(RelayState::Dispatched);

        let label = self.label();
        let mut upstream = match self.provider.chat_completion_stream(request).await {
            Ok(stream) => stream,
            Err(source) => {
                tracker.advance(RelayState::Failed);
                warn!(provider = self.provider.id(), error = %source, "Provider stream failed to open");
                return Err(RelayError::Provider {
                    provider: label,
                    source,
                });
            }
        };
        tracker.advance(RelayState::Streaming);

        let stream = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(text) => yield Ok(StreamChunk::Text(text)),
                    Err(source) => {
                        tracker.advance(RelayState::Failed);
                        warn!(error = %source, "Provider stream failed mid-way");
                        yield Err(RelayError::Provider { provider: label, source });
                        return;
                    }
                }
            }
            tracker.advance(RelayState::Complete);
            yield Ok(StreamChunk::Done);
        };

        Ok(Box::pin(stream))
    }
}
