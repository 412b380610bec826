//! Integration tests for the sidecar actions on `POST /api`.

mod common;

use axum::http::StatusCode;
use common::{body_to_json, make_app, make_app_with_transcript, post_json, test_config};
use regis::agent::ProviderSet;
use regis::logging::TranscriptLog;
use serde_json::json;
use tower::ServiceExt;

fn sidecar_app() -> axum::Router {
    make_app(test_config(), ProviderSet::empty()).0
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_runs_in_cwd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "").unwrap();

    let body = json!({
        "action": "command",
        "command": "ls",
        "cwd": dir.path(),
    })
    .to_string();
    let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["cmd_executed"], "ls");
    assert!(body["stdout"].as_str().unwrap().contains("marker.txt"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_nonzero_exit_is_not_an_error() {
    let body = json!({"action": "command", "command": "echo oops >&2; exit 3"}).to_string();
    let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], 3);
    assert_eq!(body["stderr"], "oops\n");
}

#[tokio::test]
async fn test_command_safe_mode_blocks_deny_list() {
    let body = json!({"action": "command", "command": "RM -RF /tmp/nothing"}).to_string();
    let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "forbidden_command");
    assert_eq!(body["error"], "Command blocked for safety reasons");
}

#[tokio::test]
async fn test_command_must_be_non_empty_string() {
    for command in [json!(""), json!("   "), json!(12), json!(null)] {
        let body = json!({"action": "command", "command": command}).to_string();
        let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["type"], "invalid_request");
    }
}

#[tokio::test]
async fn test_command_missing_cwd_is_not_found() {
    let body = json!({
        "action": "command",
        "command": "echo hi",
        "cwd": "/definitely/not/a/real/dir",
    })
    .to_string();
    let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "not_found_error");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_timeout() {
    let mut config = test_config();
    config.sidecar.command_timeout_seconds = 1;
    let (app, _) = make_app(config, ProviderSet::empty());

    let body = json!({"action": "command", "command": "sleep 5"}).to_string();
    let response = app.oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "timeout_error");
    assert_eq!(body["error"], "Command execution timeout (1s)");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_written_to_transcript() {
    let logs = tempfile::tempdir().unwrap();
    let (app, _) = make_app_with_transcript(
        test_config(),
        ProviderSet::empty(),
        TranscriptLog::new(logs.path(), 500),
    );

    let body = json!({"action": "command", "command": "echo transcript-check"}).to_string();
    let response = app.oneshot(post_json("/api", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let log = std::fs::read_to_string(logs.path().join("ai-commands.log")).unwrap();
    assert!(log.contains("Command: echo transcript-check"));
    assert!(log.contains("Exit Code: 0"));
    assert!(log.contains("Result: transcript-check"));
    assert!(log.contains(&"=".repeat(80)));
}

#[tokio::test]
async fn test_fs_list() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();

    let body = json!({"action": "fs_list", "cwd": dir.path()}).to_string();
    let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0], json!({"name": "..", "is_dir": true, "is_parent": true}));
    assert_eq!(files[1], json!({"name": "src", "is_dir": true, "size": 0}));
    assert_eq!(files[2], json!({"name": "Cargo.toml", "is_dir": false, "size": 9}));
    assert!(body["cwd"].as_str().is_some());
}

#[tokio::test]
async fn test_fs_list_errors() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let cases = [
        (json!("/definitely/not/a/real/dir"), StatusCode::NOT_FOUND, "not_found_error"),
        (json!(file.path()), StatusCode::BAD_REQUEST, "invalid_path_error"),
    ];

    for (cwd, status, kind) in cases {
        let body = json!({"action": "fs_list", "cwd": cwd}).to_string();
        let response = sidecar_app().oneshot(post_json("/api", &body)).await.unwrap();

        assert_eq!(response.status(), status);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["type"], kind);
    }
}

#[tokio::test]
async fn test_shutdown_cancels_token() {
    let (app, state) = make_app(test_config(), ProviderSet::empty());
    assert!(!state.shutdown.is_cancelled());

    let response = app
        .oneshot(post_json("/api", r#"{"action": "shutdown"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, json!({"status": "bye"}));
    assert!(state.shutdown.is_cancelled());
}

#[tokio::test]
async fn test_unknown_action() {
    let response = sidecar_app()
        .oneshot(post_json("/api", r#"{"action": "reboot"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, json!({"error": "Unknown action: reboot", "type": "invalid_request"}));
}
