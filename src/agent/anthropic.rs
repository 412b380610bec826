//! Anthropic Claude provider.
//!
//! Speaks the Messages API: `POST /v1/messages` with `x-api-key` auth. In
//! streaming mode the response is SSE where text arrives as
//! `content_block_delta` events carrying a `text_delta`.

use super::{
    sse, upstream_error, AgentError, ChatProvider, Completion, ProviderRequest, TextStream, Usage,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider implementation.
pub struct AnthropicProvider {
    /// Base URL (e.g., "https://api.anthropic.com")
    base_url: String,
    /// API key for x-api-key authentication
    api_key: String,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
    /// Reported on transport timeouts
    timeout_ms: u64,
}

impl AnthropicProvider {
    pub fn new(base_url: String, api_key: String, client: Arc<Client>, timeout_ms: u64) -> Self {
        Self {
            base_url,
            api_key,
            client,
            timeout_ms,
        }
    }

    fn translate_request<'a>(request: &'a ProviderRequest, stream: bool) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            system: (!request.system.is_empty()).then_some(request.system.as_str()),
            messages: request
                .messages
                .iter()
                .map(|m| MessageParam {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        request: &ProviderRequest,
        stream: bool,
    ) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::translate_request(request, stream);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::from_transport(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        Ok(response)
    }

    /// Interpret one SSE payload.
    fn parse_event(data: &str) -> Result<StreamEvent, AgentError> {
        let event: serde_json::Value = serde_json::from_str(data).map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Anthropic event: {}", e))
        })?;

        match event.get("type").and_then(|t| t.as_str()) {
            Some("content_block_delta") => {
                let text = event
                    .pointer("/delta/text")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                Ok(StreamEvent::Text(text.to_string()))
            }
            Some("message_stop") => Ok(StreamEvent::Stop),
            Some("error") => {
                let message = super::extract_error_message(data)
                    .unwrap_or_else(|| "unknown stream error".to_string());
                Err(AgentError::Stream(message))
            }
            _ => Ok(StreamEvent::Ignore),
        }
    }
}

#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Stop,
    Ignore,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<MessageParam<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn id(&self) -> &str {
        "anthropic"
    }

    async fn chat_completion(&self, request: &ProviderRequest) -> Result<Completion, AgentError> {
        let response = self.send(request, false).await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let text = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect::<String>();

        Ok(Completion {
            text,
            model: parsed.model,
            usage: parsed.usage,
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
                match item.and_then(|data| Self::parse_event(&data)) {
                    Ok(StreamEvent::Text(text)) if !text.is_empty() => yield Ok(text),
                    Ok(StreamEvent::Stop) => return,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
