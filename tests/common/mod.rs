//! Shared test utilities for Regis integration tests.
//!
//! Provides a scripted in-process provider, a ready-to-use test
//! configuration and router builders.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use futures::stream;
use regis::agent::{AgentError, ChatProvider, Completion, ProviderRequest, ProviderSet, TextStream, Usage};
use regis::api::{create_router, AppState};
use regis::config::{ProviderKind, RegisConfig};
use regis::logging::TranscriptLog;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Well-Known Test Constants
// =============================================================================

pub const ANTHROPIC_TEST_KEY: &str = "sk-ant-REDACTED";
pub const GOOGLE_TEST_KEY: &str = "AIzaTestKey0123456789abcdef";
pub const XAI_TEST_KEY: &str = "xai-test-0123456789abcdef";

// =============================================================================
// Scripted Provider
// =============================================================================

/// In-process provider returning scripted results.
///
/// Buffered results are consumed in order; the last one repeats once the
/// script runs out. Every call is counted.
pub struct MockProvider {
    kind: ProviderKind,
    results: Mutex<VecDeque<Result<Completion, AgentError>>>,
    chunks: Vec<Result<String, AgentError>>,
    open_error: Option<AgentError>,
    pub calls: AtomicU32,
    pub stream_calls: AtomicU32,
    pub last_request: Mutex<Option<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            results: Mutex::new(VecDeque::new()),
            chunks: Vec::new(),
            open_error: None,
            calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Buffered calls return `text` with the given usage.
    pub fn replying(kind: ProviderKind, text: &str, input_tokens: u64, output_tokens: u64) -> Self {
        Self::new(kind).then(Ok(Completion {
            text: text.to_string(),
            model: None,
            usage: Usage {
                input_tokens,
                output_tokens,
            },
        }))
    }

    /// Buffered calls always fail with `error`.
    pub fn failing(kind: ProviderKind, error: AgentError) -> Self {
        Self::new(kind).then(Err(error))
    }

    pub fn then(self, result: Result<Completion, AgentError>) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(result);
        self
    }

    /// Streaming calls yield these items in order.
    pub fn streaming(mut self, chunks: Vec<Result<String, AgentError>>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Streaming calls fail before the stream opens.
    pub fn refusing_stream(mut self, error: AgentError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stream_call_count(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn id(&self) -> &str {
        "mock"
    }

    async fn chat_completion(&self, request: &ProviderRequest) -> Result<Completion, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let mut results = self.results.lock().unwrap();
        let next = if results.len() > 1 {
            results.pop_front()
        } else {
            results.front().cloned()
        };
        next.unwrap_or_else(|| Err(AgentError::InvalidResponse("no scripted result".to_string())))
    }

    async fn chat_completion_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<TextStream, AgentError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        Ok(Box::pin(stream::iter(self.chunks.clone())))
    }
}

// =============================================================================
// Config and App Builders
// =============================================================================

/// Config with valid keys for every provider, millisecond retry delays and
/// file logging off.
pub fn test_config() -> RegisConfig {
    let mut config = RegisConfig::default();
    config.providers.anthropic.api_key = Some(ANTHROPIC_TEST_KEY.to_string());
    config.providers.google.api_key = Some(GOOGLE_TEST_KEY.to_string());
    config.providers.xai.api_key = Some(XAI_TEST_KEY.to_string());
    config.logging.enabled = false;

    for policy in [&mut config.retry.chat, &mut config.retry.improve] {
        policy.initial_delay_ms = 1;
        policy.max_delay_ms = 4;
    }
    config
}

/// Router over `providers` with transcripts disabled.
pub fn make_app(config: RegisConfig, providers: ProviderSet) -> (Router, Arc<AppState>) {
    make_app_with_transcript(config, providers, TranscriptLog::disabled())
}

pub fn make_app_with_transcript(
    config: RegisConfig,
    providers: ProviderSet,
    transcript: TranscriptLog,
) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::with_providers(
        Arc::new(config),
        providers,
        Arc::new(transcript),
    ));
    (create_router(Arc::clone(&state)), state)
}

/// Router with a single mock provider registered.
pub fn make_app_with_mock(provider: Arc<MockProvider>) -> (Router, Arc<AppState>) {
    make_app(test_config(), ProviderSet::empty().with(provider))
}

// =============================================================================
// Request / Response Helpers
// =============================================================================

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Read a whole response body as a string.
pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}
