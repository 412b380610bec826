//! Google Gemini provider.
//!
//! - Buffered: `POST /v1beta/models/{model}:generateContent`
//! - Streaming: `POST /v1beta/models/{model}:streamGenerateContent?alt=sse`
//! - System prompt goes to `systemInstruction`
//! - Role mapping: assistant -> model
//!
//! The key travels in the `x-goog-api-key` header so it never shows up in
//! URLs that end up in logs.

use super::{
    sse, upstream_error, AgentError, ChatProvider, Completion, ProviderRequest, Role, TextStream,
    Usage,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Google Gemini provider implementation.
pub struct GoogleProvider {
    /// Base URL (e.g., "https://generativelanguage.googleapis.com")
    base_url: String,
    api_key: String,
    client: Arc<Client>,
    timeout_ms: u64,
}

impl GoogleProvider {
    pub fn new(base_url: String, api_key: String, client: Arc<Client>, timeout_ms: u64) -> Self {
        Self {
            base_url,
            api_key,
            client,
            timeout_ms,
        }
    }

    fn translate_request(request: &ProviderRequest) -> GenerateRequest<'_> {
        let contents = request
            .messages
            .iter()
            .map(|m| Content {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        let system_instruction = (!request.system.is_empty()).then(|| SystemInstruction {
            parts: vec![Part {
                text: &request.system,
            }],
        });

        GenerateRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
            },
        }
    }

    async fn send(
        &self,
        request: &ProviderRequest,
        stream: bool,
    ) -> Result<reqwest::Response, AgentError> {
        let url = if stream {
            format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.base_url, request.model
            )
        } else {
            format!("{}/v1beta/models/{}:generateContent", self.base_url, request.model)
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::translate_request(request))
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

    /// Concatenate the text parts of the first candidate.
    fn candidate_text(response: &GenerateResponse) -> String {
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn parse_chunk(data: &str) -> Result<String, AgentError> {
        if let Some(message) = super::extract_error_message(data) {
            return Err(AgentError::Stream(message));
        }
        let chunk: GenerateResponse = serde_json::from_str(data).map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Google chunk: {}", e))
        })?;
        Ok(Self::candidate_text(&chunk))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn id(&self) -> &str {
        "google"
    }

    async fn chat_completion(&self, request: &ProviderRequest) -> Result<Completion, AgentError> {
        let response = self.send(request, false).await?;

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Google response: {}", e))
        })?;

        let usage = parsed
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(Completion {
            text: Self::candidate_text(&parsed),
            model: parsed.model_version,
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
                match item.and_then(|data| Self::parse_chunk(&data)) {
                    Ok(text) if text.is_empty() => {}
                    Ok(text) => yield Ok(text),
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
