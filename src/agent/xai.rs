//! xAI Grok provider.
//!
//! xAI exposes an OpenAI-compatible API: `POST /v1/chat/completions` with
//! Bearer authentication. Streams are SSE chunks terminated by `data: [DONE]`.

use super::{
    sse, upstream_error, AgentError, ChatProvider, Completion, ProviderRequest, TextStream,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// xAI provider implementation.
pub struct XaiProvider {
    /// Base URL (e.g., "https://api.x.ai")
    base_url: String,
    /// API key for Bearer authentication
    api_key: String,
    client: Arc<Client>,
    timeout_ms: u64,
}

impl XaiProvider {
    pub fn new(base_url: String, api_key: String, client: Arc<Client>, timeout_ms: u64) -> Self {
        Self {
            base_url,
            api_key,
            client,
            timeout_ms,
        }
    }

    /// The system prompt becomes a leading `system` message.
    fn translate_request(request: &ProviderRequest, stream: bool) -> CompletionRequest<'_> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        CompletionRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        request: &ProviderRequest,
        stream: bool,
    ) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&Self::translate_request(request, stream))
            .send()
            .await
            .map_err(|e| AgentError::from_transport(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(upstream_error(status.as_u16(), &body));
        }

        Ok(response)
    }

    /// Parse one stream payload; `None` marks the `[DONE]` sentinel.
    fn parse_chunk(data: &str) -> Option<Result<String, AgentError>> {
        if data == "[DONE]" {
            return None;
        }
        if let Some(message) = super::extract_error_message(data) {
            return Some(Err(AgentError::Stream(message)));
        }

        let chunk: ChunkResponse = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return Some(Err(AgentError::InvalidResponse(format!(
                    "Failed to parse xAI chunk: {}",
                    e
                ))))
            }
        };

        let text = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .unwrap_or_default();
        Some(Ok(text))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for XaiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Xai
    }

    fn id(&self) -> &str {
        "xai"
    }

    async fn chat_completion(&self, request: &ProviderRequest) -> Result<Completion, AgentError> {
        let response = self.send(request, false).await?;

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = parsed
            .usage
            .map(|u| super::Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(Completion {
            text,
            model: parsed.model,
            usage,
        })
    }

    async fn chat_completion_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<TextStream, AgentError> {
        let response = self.send(request, true).await?;
        let mut events = Box::pin(sse::data_events(response.bytes_stream()));

        let stream = async_stream::stream! {
            while let Some(item) = events.next().await {
                let data = match item {
                    Ok(data) => data,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                match Self::parse_chunk(&data) {
                    None => return,
                    Some(Ok(text)) if text.is_empty() => {}
                    Some(Ok(text)) => yield Ok(text),
                    Some(Err(e)) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
