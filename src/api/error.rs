//! Error taxonomy and JSON error envelope.
//!
//! Every failure a client can see is one of the [`ErrorKind`] codes. The
//! code picks the HTTP status and is sent as the `type` field so the
//! frontend can branch on it.

use crate::config::CredentialError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingDependency,
    MissingApiKey,
    InvalidApiKey,
    InvalidRequest,
    AuthenticationError,
    RateLimitError,
    QuotaError,
    ApiError,
    TimeoutError,
    NotFoundError,
    PermissionError,
    ExecutionError,
    ForbiddenCommand,
    InvalidPathError,
    /// Request body over `server.max_body_bytes`.
    PayloadTooLarge,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingDependency => "missing_dependency",
            ErrorKind::MissingApiKey => "missing_api_key",
            ErrorKind::InvalidApiKey => "invalid_api_key",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::RateLimitError => "rate_limit_error",
            ErrorKind::QuotaError => "quota_error",
            ErrorKind::ApiError => "api_error",
            ErrorKind::TimeoutError => "timeout_error",
            ErrorKind::NotFoundError => "not_found_error",
            ErrorKind::PermissionError => "permission_error",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::ForbiddenCommand => "forbidden_command",
            ErrorKind::InvalidPathError => "invalid_path_error",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::InternalError => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::MissingApiKey | ErrorKind::InvalidApiKey | ErrorKind::AuthenticationError => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::RateLimitError | ErrorKind::QuotaError => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::InvalidRequest | ErrorKind::InvalidPathError => StatusCode::BAD_REQUEST,
            ErrorKind::TimeoutError => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::NotFoundError => StatusCode::NOT_FOUND,
            ErrorKind::PermissionError | ErrorKind::ForbiddenCommand => StatusCode::FORBIDDEN,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::MissingDependency
            | ErrorKind::ApiError
            | ErrorKind::ExecutionError
            | ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a provider error message by substring.
    ///
    /// Checked in order: authentication, rate limit, quota; anything else is
    /// a generic provider failure.
    pub fn classify_provider_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("authentication") || lower.contains("api key") {
            ErrorKind::AuthenticationError
        } else if lower.contains("rate limit") || lower.contains("429") {
            ErrorKind::RateLimitError
        } else if lower.contains("quota") {
            ErrorKind::QuotaError
        } else {
            ErrorKind::ApiError
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error envelope returned to clients: `{"error": .., "type": .., "details"?: ..}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create a bad request error (400).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// The request body was not valid JSON.
    pub fn invalid_json() -> Self {
        Self::invalid_request("Invalid JSON")
    }

    /// Unknown route (404).
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFoundError, "Not Found")
    }

    /// Generic failure; detail belongs in the log, not in the response.
    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalError, "Internal server error")
    }

    /// Provider failure classified from its message.
    ///
    /// The client gets a short actionable message; the raw provider text
    /// goes into `details`.
    pub fn provider_failure(provider: &str, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = ErrorKind::classify_provider_message(&raw);
        let message = match kind {
            ErrorKind::AuthenticationError => {
                format!("Authentication failed. Please check your {} API key.", provider)
            }
            ErrorKind::RateLimitError => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            ErrorKind::QuotaError => {
                "API quota exceeded. Please check your account limits.".to_string()
            }
            _ => format!("{} API error: {}", provider, raw),
        };
        Self::new(kind, message).with_details(raw)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing { env } => ApiError::new(
                ErrorKind::MissingApiKey,
                format!("{} not configured in .env file. Please add your API key.", env),
            ),
            CredentialError::Invalid { reason } => ApiError::new(ErrorKind::InvalidApiKey, reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
