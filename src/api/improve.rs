//! Prompt improvement: `POST /api/improve` and `POST /api/claude/improve`.
//!
//! Once a prompt is present this endpoint never fails: any problem reaching
//! or using the provider answers with the original prompt unchanged.

use super::chat::usable_provider;
use super::error::ApiError;
use super::types::{ImproveResponse, JsonBody};
use super::AppState;
use crate::agent::{ChatMessage, ProviderRequest};
use crate::config::ProviderKind;
use crate::relay::{Relay, RelayError};
use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const IMPROVE_SYSTEM_PROMPT: &str = "You are a prompt engineering expert.
You receive a user's prompt and must improve it so that it is:
- More precise
- Better phrased
- Includes context if it is missing
Respond ONLY with the improved prompt, without explanations.";

#[derive(Error, Debug)]
enum ImproveError {
    #[error("{0}")]
    Unusable(ApiError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("provider returned an empty prompt")]
    Empty,
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody,
) -> Result<Json<ImproveResponse>, ApiError> {
    let prompt = match body.get("prompt").and_then(Value::as_str) {
        Some(p) if !p.trim().is_empty() => p.to_string(),
        _ => return Err(ApiError::invalid_request("No prompt provided")),
    };

    let improved = match improve_prompt(&state, &prompt).await {
        Ok(improved) => {
            info!(chars = improved.chars().count(), "Prompt improved");
            improved
        }
        Err(e) => {
            warn!(error = %e, "Prompt improvement failed, returning original");
            prompt
        }
    };

    Ok(Json(ImproveResponse { improved }))
}

async fn improve_prompt(state: &AppState, prompt: &str) -> Result<String, ImproveError> {
    let providers = &state.config.providers;
    let model = providers.improve_model.clone();
    let kind = ProviderKind::from_model(&model).unwrap_or(providers.default_provider);
    let provider = usable_provider(state, kind).map_err(ImproveError::Unusable)?;

    let relay = Relay::new(
        provider,
        state.config.improve_retry_policy(),
        Duration::from_secs(providers.request_timeout_seconds),
    );
    let request = ProviderRequest {
        model,
        system: IMPROVE_SYSTEM_PROMPT.to_string(),
        messages: vec![ChatMessage::user(format!("Improve this prompt:\n\n{}", prompt))],
        max_tokens: providers.improve_max_tokens,
    };

    let completion = relay.complete(&request).await?;
    let improved = completion.text.trim();
    if improved.is_empty() {
        return Err(ImproveError::Empty);
    }
    Ok(improved.to_string())
}
