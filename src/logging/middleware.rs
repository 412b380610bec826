//! Request ID generation and per-request spans

use axum::body::Body;
use axum::http::Request;
use tracing::Span;
use uuid::Uuid;

/// Generate a new request ID using UUID v4
///
/// # Examples
///
/// ```
/// use regis::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert!(!request_id.is_empty());
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping every HTTP request, tagged with a fresh request ID.
///
/// Used as the `make_span_with` hook of the router's trace layer.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %generate_request_id(),
        method = %request.method(),
        path = %request.uri().path(),
    )
}
