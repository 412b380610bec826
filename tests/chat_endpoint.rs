//! Integration tests for the buffered chat endpoint.
//!
//! Requests go through the full router; providers are scripted in-process
//! so call counts can be asserted.

mod common;

use axum::http::StatusCode;
use common::{
    body_to_json, body_to_string, make_app, make_app_with_mock, post_json, test_config, MockProvider,
};
use regis::agent::{AgentError, ProviderSet};
use regis::config::ProviderKind;
use regis::logging::TranscriptLog;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const HI: &str = r#"{"messages": [{"role": "user", "content": "hi"}], "stream": false}"#;

#[tokio::test]
async fn test_buffered_round_trip() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({
            "content": "hello",
            "model": "claude-sonnet-4-20250514",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        })
    );
    assert_eq!(mock.call_count(), 1);
    assert_eq!(mock.stream_call_count(), 0);
}

#[tokio::test]
async fn test_legacy_claude_route_is_the_same_endpoint() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let response = app.oneshot(post_json("/api/claude/chat", HI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_request_fields_reach_provider() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "ok", 3, 1));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let body = r#"{
        "model": "claude-3-5-haiku-latest",
        "systemPrompt": "Answer in French.",
        "messages": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "salut"},
            {"role": "user", "content": "ca va?"}
        ],
        "stream": false
    }"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = mock.last_request().unwrap();
    assert_eq!(request.model, "claude-3-5-haiku-latest");
    assert_eq!(request.system, "Answer in French.");
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.max_tokens, 4096);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["model"], "claude-3-5-haiku-latest");
}

#[tokio::test]
async fn test_model_prefix_selects_provider() {
    let claude = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "from claude", 1, 1));
    let grok = Arc::new(MockProvider::replying(ProviderKind::Xai, "from grok", 1, 1));
    let providers = ProviderSet::empty()
        .with(Arc::clone(&claude) as _)
        .with(Arc::clone(&grok) as _);
    let (app, _) = make_app(test_config(), providers);

    let body = r#"{"model": "grok-3", "messages": [{"role": "user", "content": "hi"}], "stream": false}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["content"], "from grok");
    assert_eq!(grok.call_count(), 1);
    assert_eq!(claude.call_count(), 0);
}

#[tokio::test]
async fn test_empty_messages_rejected() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let response = app
        .oneshot(post_json("/api/chat", r#"{"messages": [], "stream": false}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "invalid_request");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_messages_rejected() {
    let cases = [
        r#"{}"#,
        r#"{"messages": "hi"}"#,
        r#"{"messages": [{"role": "system", "content": "x"}]}"#,
        r#"{"messages": [{"role": "user", "content": 42}]}"#,
        r#"{"messages": ["hi"]}"#,
        r#"{"provider": "openai", "messages": [{"role": "user", "content": "hi"}]}"#,
    ];

    for body in cases {
        let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
        let (app, _) = make_app_with_mock(Arc::clone(&mock));

        let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["type"], "invalid_request", "{}", body);
        assert_eq!(mock.call_count() + mock.stream_call_count(), 0);
    }
}

#[tokio::test]
async fn test_invalid_json_body() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let (app, _) = make_app_with_mock(mock);

    let response = app
        .oneshot(post_json("/api/chat", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, json!({"error": "Invalid JSON", "type": "invalid_request"}));
}

#[tokio::test]
async fn test_missing_key_never_calls_provider() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let mut config = test_config();
    config.providers.anthropic.api_key = None;
    let (app, _) = make_app(config, ProviderSet::empty().with(Arc::clone(&mock) as _));

    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "missing_api_key");
    assert!(body["error"].as_str().unwrap().contains("ANTHROPIC_API_KEY"));
    assert_eq!(mock.call_count(), 0);
    assert_eq!(mock.stream_call_count(), 0);
}

#[tokio::test]
async fn test_badly_formatted_key_rejected() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Google, "hello", 1, 1));
    let mut config = test_config();
    config.providers.google.api_key = Some("short".to_string());
    let (app, _) = make_app(config, ProviderSet::empty().with(Arc::clone(&mock) as _));

    let body = r#"{"model": "gemini-2.0-flash", "messages": [{"role": "user", "content": "hi"}]}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "invalid_api_key");
    assert_eq!(mock.call_count() + mock.stream_call_count(), 0);
}

#[tokio::test]
async fn test_disabled_provider_is_missing_dependency() {
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello", 1, 1));
    let (app, _) = make_app_with_mock(mock);

    let body = r#"{"provider": "gemini", "messages": [{"role": "user", "content": "hi"}]}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "missing_dependency");
    assert_eq!(body["error"], "Gemini provider is not available");
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock = Arc::new(
        MockProvider::failing(
            ProviderKind::Anthropic,
            AgentError::Upstream {
                status: 529,
                message: "overloaded_error: Overloaded".to_string(),
            },
        )
        .then(Ok(regis::agent::Completion {
            text: "recovered".to_string(),
            model: Some("claude-sonnet-4-20250514".to_string()),
            usage: Default::default(),
        })),
    );
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["content"], "recovered");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_retries_exhausted_surfaces_last_error() {
    let mock = Arc::new(MockProvider::failing(
        ProviderKind::Anthropic,
        AgentError::Upstream {
            status: 429,
            message: "rate_limit_error: Too many requests".to_string(),
        },
    ));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "rate_limit_error");
    assert!(body["details"].as_str().unwrap().contains("Too many requests"));
    // max_retries = 3 -> four attempts
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let mock = Arc::new(MockProvider::failing(
        ProviderKind::Xai,
        AgentError::Upstream {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        },
    ));
    let (app, _) = make_app_with_mock(Arc::clone(&mock));

    let body = r#"{"model": "grok-3", "messages": [{"role": "user", "content": "hi"}], "stream": false}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["type"], "authentication_error");
    assert_eq!(body["error"], "Authentication failed. Please check your Grok API key.");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_chat_turns_are_written_to_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockProvider::replying(ProviderKind::Anthropic, "hello there", 1, 2));
    let (app, _) = common::make_app_with_transcript(
        test_config(),
        ProviderSet::empty().with(mock as _),
        TranscriptLog::new(dir.path(), 500),
    );

    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let log = std::fs::read_to_string(dir.path().join("chat.log")).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[USER] hi"));
    assert!(lines[1].ends_with("[ASSISTANT] hello there"));
}

#[tokio::test]
async fn test_streamed_turns_are_written_to_transcript_on_done() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockProvider::new(ProviderKind::Anthropic)
            .streaming(vec![Ok("hello ".to_string()), Ok("there".to_string())]),
    );
    let (app, _) = common::make_app_with_transcript(
        test_config(),
        ProviderSet::empty().with(mock as _),
        TranscriptLog::new(dir.path(), 500),
    );

    let body = r#"{"messages": [{"role": "user", "content": "hi"}], "stream": true}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_to_string(response.into_body()).await;
    assert!(text.ends_with("data: [DONE]\n\n"));

    let log = std::fs::read_to_string(dir.path().join("chat.log")).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[USER] hi"));
    assert!(lines[1].ends_with("[ASSISTANT] hello there"));
}

#[tokio::test]
async fn test_failed_chat_leaves_no_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let buffered = Arc::new(MockProvider::failing(
        ProviderKind::Anthropic,
        AgentError::Upstream {
            status: 401,
            message: "authentication_error: invalid x-api-key".to_string(),
        },
    ));
    let (app, _) = common::make_app_with_transcript(
        test_config(),
        ProviderSet::empty().with(buffered as _),
        TranscriptLog::new(dir.path(), 500),
    );
    let response = app.oneshot(post_json("/api/chat", HI)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let streamed = Arc::new(MockProvider::new(ProviderKind::Anthropic).streaming(vec![
        Ok("partial".to_string()),
        Err(AgentError::Stream("overloaded_error: Overloaded".to_string())),
    ]));
    let (app, _) = common::make_app_with_transcript(
        test_config(),
        ProviderSet::empty().with(streamed as _),
        TranscriptLog::new(dir.path(), 500),
    );
    let body = r#"{"messages": [{"role": "user", "content": "hi"}]}"#;
    let response = app.oneshot(post_json("/api/chat", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_to_string(response.into_body()).await;
    assert!(!text.contains("[DONE]"));

    assert!(!dir.path().join("chat.log").exists());
}
