//! Request extraction and response bodies for the HTTP API.

use super::error::{ApiError, ErrorKind};
use crate::agent::Usage;
use crate::config::ProviderKind;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Untyped JSON request body.
///
/// An empty body reads as `{}`; anything that does not parse is rejected
/// with `400 {"error": "Invalid JSON", "type": "invalid_request"}`.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::new(ErrorKind::PayloadTooLarge, "Request body too large")
            } else {
                ApiError::invalid_request(rejection.body_text())
            }
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(Value::Object(Default::default())));
        }

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            ApiError::invalid_json()
        })
    }
}

/// Buffered chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Improve-prompt response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproveResponse {
    pub improved: String,
}

/// `GET /api` response.
#[derive(Debug, Serialize)]
pub struct AliveResponse {
    pub status: &'static str,
    pub mode: &'static str,
    pub version: &'static str,
    /// Provider name -> whether it is enabled.
    pub providers: BTreeMap<ProviderKind, bool>,
}

/// Per-provider readiness in `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub enabled: bool,
    pub has_key: bool,
}

/// `GET /api/health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// RFC 3339 local time.
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub providers: BTreeMap<ProviderKind, ProviderHealth>,
}

/// `GET /api/config` response. Never contains key material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub default_provider: ProviderKind,
    pub has_claude_key: bool,
    pub has_gemini_key: bool,
    pub has_grok_key: bool,
    pub safe_mode: bool,
}
