//! # HTTP API
//!
//! JSON endpoints consumed by the Regis AI Studio frontend.
//!
//! ## Endpoints
//!
//! - `GET /api` - Liveness and enabled providers
//! - `GET /api/health` - Health with uptime and provider readiness
//! - `GET /api/config` - Which credentials are configured (never the keys)
//! - `POST /api/chat`, `POST /api/claude/chat` - Chat, streaming (SSE) or buffered
//! - `POST /api/improve`, `POST /api/claude/improve` - Rewrite a prompt
//! - `POST /api` - Sidecar actions: `command`, `fs_list`, `shutdown`
//!
//! ## Example
//!
//! ```no_run
//! use regis::api::{create_router, AppState};
//! use regis::config::RegisConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(RegisConfig::default());
//! let state = Arc::new(AppState::new(config)?);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every error is a JSON envelope with a stable `type`:
//! ```json
//! { "error": "Invalid request: 'messages' array is empty", "type": "invalid_request" }
//! ```

mod chat;
pub mod error;
mod improve;
mod sidecar;
mod status;
pub mod types;
pub mod validation;

pub use error::{ApiError, ErrorKind};
pub use types::*;

use crate::agent::ProviderSet;
use crate::config::RegisConfig;
use crate::logging::{request_span, TranscriptLog};
use crate::sidecar::CommandRunner;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<RegisConfig>,
    pub providers: ProviderSet,
    pub transcript: Arc<TranscriptLog>,
    pub commands: CommandRunner,
    /// Cancelled by the `shutdown` sidecar action.
    pub shutdown: CancellationToken,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Build state with every enabled provider wired to the real APIs.
    pub fn new(config: Arc<RegisConfig>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()?;

        let providers = ProviderSet::from_config(&config.providers, Arc::new(http_client));
        let transcript = Arc::new(TranscriptLog::from_config(&config.logging));
        Ok(Self::with_providers(config, providers, transcript))
    }

    /// Build state around an explicit provider set.
    pub fn with_providers(
        config: Arc<RegisConfig>,
        providers: ProviderSet,
        transcript: Arc<TranscriptLog>,
    ) -> Self {
        Self {
            commands: CommandRunner::new(&config.sidecar),
            config,
            providers,
            transcript,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;

    let routes = Router::new()
        .route(
            "/api",
            get(status::alive).post(sidecar::handle).options(preflight),
        )
        .route("/api/health", get(status::health).options(preflight))
        .route("/api/config", get(status::config).options(preflight))
        .route("/api/chat", post(chat::handle).options(preflight))
        .route("/api/claude/chat", post(chat::handle).options(preflight))
        .route("/api/improve", post(improve::handle).options(preflight))
        .route("/api/claude/improve", post(improve::handle).options(preflight))
        .fallback(fallback);

    with_layers(routes, max_body).with_state(state)
}

/// Middleware shared by every route.
///
/// The body limit is enforced by the extractors so that oversized bodies
/// still get the JSON `payload_too_large` envelope.
fn with_layers(routes: Router<Arc<AppState>>, max_body: usize) -> Router<Arc<AppState>> {
    routes
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// `OPTIONS` without CORS request headers still gets a bodiless 200.
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            ),
        ],
    )
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }
    ApiError::not_found().into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal().into_response()
}
