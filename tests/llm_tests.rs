// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use woody::config::{InferenceConfig, Settings};
use woody::error::{ApiError, WoodyError};
use woody::llm::message::{Role, Turn};
use woody::llm::provider::{CompletionRequest, Fragment, InferenceEngine};
use woody::llm::providers::OpenAiCompatEngine;

fn sse_body(pieces: &[&str]) -> String {
    let mut body = String::new();
    for piece in pieces {
        let chunk = json!({"choices": [{"delta": {"content": piece}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn request() -> CompletionRequest {
    CompletionRequest::from_config(
        vec![Turn::system("Be brief."), Turn::user("hi")],
        &InferenceConfig::default(),
    )
}

async fn collect(engine: &OpenAiCompatEngine) -> Vec<Fragment> {
    let stream = engine.stream(request()).await.expect("stream starts");
    stream.map(|item| item.expect("fragment")).collect().await
}

#[test]
fn test_role_serialization() {
    assert_eq!(serde_json::to_value(Role::System).unwrap(), "system");
    assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    assert_eq!(
        serde_json::to_value(Turn::user("q")).unwrap(),
        json!({"role": "user", "content": "q"})
    );
}

#[test]
fn test_request_from_config() {
    let request = request();
    assert_eq!(request.max_tokens, 360);
    assert_eq!(request.stop, ["<|im_end|>", "</s>"]);
    assert_eq!(request.seed, Some(326));
    assert_eq!(request.messages.len(), 2);
}

#[tokio::test]
async fn test_engine_sends_generation_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "stream": true,
            "max_tokens": 360,
            "seed": 326,
            "stop": ["<|im_end|>", "</s>"],
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/event-stream")
                .set_body_string(sse_body(&["Hel", "lo"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = OpenAiCompatEngine::new(server.uri(), "local");
    assert_eq!(
        collect(&engine).await,
        [
            Fragment::Content("Hel".to_string()),
            Fragment::Content("lo".to_string()),
            Fragment::End,
        ]
    );
}

#[tokio::test]
async fn test_engine_from_settings_uses_configured_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_body(&["ok"])))
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.inference.base_url = Some(format!("{}/", server.uri()));
    settings.inference.base_url_env = "WOODY_TEST_LLM_UNSET_URL".to_string();

    let engine = OpenAiCompatEngine::from_settings(&settings);
    let fragments = collect(&engine).await;
    assert_eq!(fragments.first(), Some(&Fragment::Content("ok".to_string())));
}

#[tokio::test]
async fn test_engine_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
        .mount(&server)
        .await;

    let engine = OpenAiCompatEngine::new(server.uri(), "local");
    let err = match engine.stream(request()).await {
        Ok(_) => panic!("expected a server error"),
        Err(e) => e,
    };
    match err {
        WoodyError::Api(ApiError::ServerError { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("out of memory"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
