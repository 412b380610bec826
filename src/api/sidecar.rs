//! Sidecar actions on `POST /api`.

use super::error::{ApiError, ErrorKind};
use super::types::JsonBody;
use super::AppState;
use crate::sidecar::{list_dir, SidecarError};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

impl From<SidecarError> for ApiError {
    fn from(err: SidecarError) -> Self {
        let kind = match &err {
            SidecarError::EmptyCommand => ErrorKind::InvalidRequest,
            SidecarError::Forbidden { .. } => ErrorKind::ForbiddenCommand,
            SidecarError::Timeout { .. } => ErrorKind::TimeoutError,
            SidecarError::NotFound(_) => ErrorKind::NotFoundError,
            SidecarError::PermissionDenied(_) => ErrorKind::PermissionError,
            SidecarError::NotADirectory(_) => ErrorKind::InvalidPathError,
            SidecarError::Execution(_) => ErrorKind::ExecutionError,
            SidecarError::Io(_) => ErrorKind::InternalError,
        };
        let api = ApiError::new(kind, err.to_string());
        match err {
            SidecarError::Forbidden { command } | SidecarError::Timeout { command, .. } => {
                api.with_details(command)
            }
            _ => api,
        }
    }
}

/// Working directory from the body, else the process working directory.
fn working_dir(body: &Value) -> Result<PathBuf, ApiError> {
    match body.get("cwd").and_then(Value::as_str) {
        Some(cwd) if !cwd.trim().is_empty() => Ok(PathBuf::from(cwd)),
        _ => std::env::current_dir().map_err(|e| {
            tracing::error!(error = %e, "Cannot determine working directory");
            ApiError::internal()
        }),
    }
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let action = body.get("action").and_then(Value::as_str).unwrap_or_default();

    match action {
        "command" => {
            let command = body.get("command").and_then(Value::as_str).unwrap_or_default();
            let cwd = working_dir(&body)?;
            let output = state.commands.run(command, &cwd).await?;
            state
                .transcript
                .log_command(&output.cmd_executed, output.transcript_text(), output.code)
                .await;
            Ok(Json(output).into_response())
        }
        "fs_list" => {
            let cwd = working_dir(&body)?;
            let listing = list_dir(&cwd).await?;
            Ok(Json(listing).into_response())
        }
        "shutdown" => {
            info!("Shutdown requested by client");
            state.shutdown.cancel();
            Ok(Json(json!({ "status": "bye" })).into_response())
        }
        other => Err(ApiError::invalid_request(format!("Unknown action: {}", other))),
    }
}
