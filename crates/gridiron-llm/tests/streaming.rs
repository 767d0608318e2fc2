//! Streaming completion and extraction against a mock chat-completions server.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gridiron_core::config::LlmConfig;
use gridiron_llm::extract::extract_rankings;
use gridiron_llm::{LlmClient, LlmError, OpenAiClient};

fn settings(server: &MockServer) -> LlmConfig {
    LlmConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        model: "gpt-3.5-turbo".into(),
        max_tokens: 1500,
        temperature: 0.0,
        timeout_secs: 10,
    }
}

/// Build an SSE body from content fragments, ending with `[DONE]`.
fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::from("data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for f in fragments {
        let chunk = serde_json::json!({
            "choices": [ { "index": 0, "delta": { "content": f }, "finish_reason": null } ]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn collects_streamed_fragments() {
    let server = MockServer::start().await;
    mount_stream(&server, sse_body(&["Hel", "lo", " there"])).await;

    let client = OpenAiClient::new("sk-test".into(), &settings(&server));
    let completion = client.complete("say hello").await.expect("completion");

    assert_eq!(completion.text, "Hello there");
    assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn extracts_rankings_from_fenced_reply() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse_body(&[
            "```json\n[",
            "{\"rank\": 1, \"name\": \"Josh Allen\", \"position\": \"QB\", \"team\": \"BUF\"},",
            "{\"rank\": 2, \"name\": \"Bijan Robinson\", \"position\": \"RB\", \"team\": \"ATL\"}",
            "]\n```",
        ]),
    )
    .await;

    let client = LlmClient::Active(OpenAiClient::new("sk-test".into(), &settings(&server)));
    let players = extract_rankings(&client, "1. Josh Allen QB BUF\n2. Bijan Robinson RB ATL")
        .await
        .expect("rankings");

    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "Josh Allen");
    assert_eq!(players[1].team, "ATL");
    assert_eq!(players[1].rank, Some(2));
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad key\"}"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("sk-test".into(), &settings(&server));
    match client.complete("hi").await {
        Err(LlmError::Stream(message)) => assert!(message.contains("401"), "{message}"),
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_stream_is_an_error() {
    let server = MockServer::start().await;
    mount_stream(&server, sse_body(&[])).await;

    let client = OpenAiClient::new("sk-test".into(), &settings(&server));
    match client.complete("hi").await {
        Err(LlmError::EmptyResponse) => {}
        other => panic!("expected EmptyResponse, got {other:?}"),
    }
}
