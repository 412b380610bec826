//! Chat session endpoint: `POST /api/chat` and `POST /api/claude/chat`.

use super::error::{ApiError, ErrorKind};
use super::types::{ChatResponse, JsonBody};
use super::validation::{select_provider, validate_chat_request_for};
use super::AppState;
use crate::agent::{ChatProvider, ProviderRequest};
use crate::config::ProviderKind;
use crate::logging::TranscriptLog;
use crate::relay::{Relay, RelayStream, StreamChunk};
use axum::{
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Why a provider cannot serve a request before anything is sent to it.
pub(super) fn unavailable(kind: ProviderKind) -> ApiError {
    ApiError::new(
        ErrorKind::MissingDependency,
        format!("{} provider is not available", kind.display_name()),
    )
}

/// Resolve an enabled provider with a usable credential.
pub(super) fn usable_provider(
    state: &AppState,
    kind: ProviderKind,
) -> Result<Arc<dyn ChatProvider>, ApiError> {
    let provider = state.providers.get(kind).ok_or_else(|| unavailable(kind))?;
    state.config.providers.credential(kind)?;
    Ok(provider)
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let providers = &state.config.providers;

    // Credentials are checked before the body, so the provider is picked first.
    let kind = select_provider(&body, providers).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    let provider = usable_provider(&state, kind)?;
    let request = validate_chat_request_for(kind, &body, providers)
        .map_err(|e| ApiError::invalid_request(e.to_string()))?;

    info!(
        provider = %kind,
        model = %request.model,
        messages = request.messages.len(),
        stream = request.stream,
        "Chat request"
    );

    let relay = Relay::new(
        provider,
        state.config.chat_retry_policy(),
        Duration::from_secs(providers.request_timeout_seconds),
    );
    let user_text = request.last_user_message().map(str::to_string);
    let provider_request = ProviderRequest {
        model: request.model.clone(),
        system: request.system,
        messages: request.messages,
        max_tokens: providers.chat_max_tokens,
    };

    if request.stream {
        let chunks = relay.stream(&provider_request).await?;
        let events = sse_events(chunks, Arc::clone(&state.transcript), user_text);
        return Ok(Sse::new(events).into_response());
    }

    let completion = relay.complete(&provider_request).await?;
    log_exchange(&state.transcript, user_text.as_deref(), &completion.text).await;
    info!(
        provider = %kind,
        input_tokens = completion.usage.input_tokens,
        output_tokens = completion.usage.output_tokens,
        "Chat completed"
    );

    Ok(Json(ChatResponse {
        content: completion.text,
        model: completion.model.unwrap_or(request.model),
        usage: completion.usage,
    })
    .into_response())
}

/// Record a successful exchange: the user's turn, then the reply.
async fn log_exchange(transcript: &TranscriptLog, user_text: Option<&str>, reply: &str) {
    if let Some(text) = user_text {
        transcript.log_chat("user", text).await;
    }
    transcript.log_chat("assistant", reply).await;
}

/// Map relay chunks to SSE events. The exchange is written to the
/// transcript once the stream completes.
fn sse_events(
    mut chunks: RelayStream,
    transcript: Arc<TranscriptLog>,
    user_text: Option<String>,
) -> impl futures::Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut full_text = String::new();
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    if let StreamChunk::Text(text) = &chunk {
                        full_text.push_str(text);
                    } else {
                        log_exchange(&transcript, user_text.as_deref(), &full_text).await;
                    }
                    yield Ok(Event::default().data(chunk.to_sse_data()));
                }
                Err(e) => {
                    warn!(error = %e, "Chat stream ended with an error");
                    yield Ok(Event::default().data(e.to_sse_data()));
                    return;
                }
            }
        }
    }
}
