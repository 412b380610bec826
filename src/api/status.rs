//! Liveness, health and public configuration endpoints.

use super::types::{AliveResponse, ConfigResponse, HealthResponse, ProviderHealth};
use super::AppState;
use crate::config::ProviderKind;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /api
pub async fn alive(State(state): State<Arc<AppState>>) -> Json<AliveResponse> {
    Json(AliveResponse {
        status: "Alive",
        mode: "Claude + Gemini + Grok",
        version: env!("CARGO_PKG_VERSION"),
        providers: ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, state.providers.contains(kind)))
            .collect(),
    })
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            (
                kind,
                ProviderHealth {
                    enabled: state.providers.contains(kind),
                    has_key: state.config.providers.credential(kind).is_ok(),
                },
            )
        })
        .collect();

    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Local::now().to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        providers,
    })
}

/// GET /api/config
pub async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let providers = &state.config.providers;
    Json(ConfigResponse {
        default_provider: providers.default_provider,
        has_claude_key: providers.has_key(ProviderKind::Anthropic),
        has_gemini_key: providers.has_key(ProviderKind::Google),
        has_grok_key: providers.has_key(ProviderKind::Xai),
        safe_mode: state.config.sidecar.safe_mode,
    })
}
