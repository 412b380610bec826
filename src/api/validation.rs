//! Chat request validation.
//!
//! Turns an untyped JSON body into a [`ChatRequest`] or explains why it is
//! unusable. Pure: no network or filesystem access.

use crate::agent::{ChatMessage, Role};
use crate::config::{ProviderKind, ProvidersConfig};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// System prompt used when the request does not carry one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Why a chat request was rejected. All variants map to `invalid_request`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request: body must be a JSON object")]
    NotAnObject,

    #[error("Invalid request: 'messages' must be an array")]
    MessagesNotArray,

    #[error("Invalid request: 'messages' array is empty")]
    MessagesEmpty,

    #[error("Invalid request: message {index} must be an object")]
    MessageNotObject { index: usize },

    #[error("Invalid request: message {index} has invalid role (expected 'user' or 'assistant')")]
    InvalidRole { index: usize },

    #[error("Invalid request: message {index} content must be a string")]
    InvalidContent { index: usize },

    #[error("Invalid request: unknown provider '{0}'")]
    UnknownProvider(String),
}

/// A validated chat request.
///
/// `messages` is never empty and `model` is never an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Content of the final message when it was sent by the user.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Pick the provider for a request body.
///
/// Order: explicit `provider` field, then model prefix, then the configured
/// default. Only an unrecognised `provider` string is an error.
pub fn select_provider(body: &Value, config: &ProvidersConfig) -> Result<ProviderKind, ValidationError> {
    if let Some(name) = body.get("provider").and_then(Value::as_str) {
        return name
            .parse()
            .map_err(|_| ValidationError::UnknownProvider(name.to_string()));
    }

    Ok(body
        .get("model")
        .and_then(Value::as_str)
        .and_then(ProviderKind::from_model)
        .unwrap_or(config.default_provider))
}

/// Validate and normalise a chat request body.
pub fn validate_chat_request(
    body: &Value,
    config: &ProvidersConfig,
) -> Result<ChatRequest, ValidationError> {
    let provider = select_provider(body, config)?;
    validate_chat_request_for(provider, body, config)
}

/// Like [`validate_chat_request`], for a provider the caller already selected.
pub fn validate_chat_request_for(
    provider: ProviderKind,
    body: &Value,
    config: &ProvidersConfig,
) -> Result<ChatRequest, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let messages = match object.get("messages") {
        None | Some(Value::Null) => return Err(ValidationError::MessagesEmpty),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::MessagesNotArray),
    };
    if messages.is_empty() {
        return Err(ValidationError::MessagesEmpty);
    }
    let messages = messages
        .iter()
        .enumerate()
        .map(|(index, item)| parse_message(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    // Model ids are not checked against a list; the provider rejects unknown ones.
    let model = match object.get("model").and_then(Value::as_str) {
        Some(model) if !model.trim().is_empty() => model.to_string(),
        _ => config.default_model(provider),
    };

    let system = object
        .get("system")
        .or_else(|| object.get("systemPrompt"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string();

    let stream = object.get("stream").map(coerce_bool).unwrap_or(true);

    Ok(ChatRequest {
        provider,
        model,
        system,
        messages,
        stream,
    })
}

fn parse_message(index: usize, item: &Value) -> Result<ChatMessage, ValidationError> {
    let object = item
        .as_object()
        .ok_or(ValidationError::MessageNotObject { index })?;

    let role = match object.get("role").and_then(Value::as_str) {
        Some("user") => Role::User,
        Some("assistant") => Role::Assistant,
        _ => return Err(ValidationError::InvalidRole { index }),
    };

    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or(ValidationError::InvalidContent { index })?;

    Ok(ChatMessage {
        role,
        content: content.to_string(),
    })
}

/// Truthiness of a JSON value: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
