//! Replay through a real server on a random port

use serde_json::{Map, Value, json};
use tapedeck_client::{CassetteRequest, extract_token_usage, read_chat_completion_response};
use tapedeck_core::RequestBody;
use tapedeck_core::request::{ChatCompletionRequest, ChatMessage, EmbeddingsRequest};
use tapedeck_egress::UpstreamCredentials;
use tapedeck_integration_tests::{cassette_dir, fixtures, spawn_server, test_config};

fn chat(model: &str, content: &str, stream: Option<bool>) -> RequestBody {
    RequestBody::Chat(ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::new("user", content)],
        stream,
        extra: Map::new(),
    })
}

#[tokio::test]
async fn test_named_cassette_replays_verbatim() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let response = CassetteRequest::new(&server.base_url, "chat-basic", chat("m", "Hello!", None))
        .send(&reqwest::Client::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-request-id"], "req_basic");
    assert!(!response.headers().contains_key("x-tapedeck-error"));
    let body = response.text().await.unwrap();
    assert_eq!(
        body,
        r#"{"id":"chatcmpl-basic","object":"chat.completion","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there!"},"finish_reason":"stop"}]}"#
    );
}

#[tokio::test]
async fn test_unnamed_request_matches_despite_key_order() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/v1/chat/completions", server.base_url))
        .header("content-type", "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"Hello!"}]}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], "chatcmpl-basic");
}

#[tokio::test]
async fn test_changed_request_is_out_of_date() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let response = CassetteRequest::new(&server.base_url, "chat-basic", chat("m", "Goodbye!", None))
        .send(&reqwest::Client::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    assert_eq!(response.headers()["x-tapedeck-error"], "true");
    let body = response.text().await.unwrap();
    assert!(body.starts_with("Tapedeck Error: "));
    assert!(body.contains("Interaction out of date"));
    assert!(body.contains("chat-basic.yaml"));
}

#[tokio::test]
async fn test_streaming_replay_delivers_every_event() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let response = CassetteRequest::new(
        &server.base_url,
        "chat-streaming",
        chat("gpt-4o-mini", "Count to 3", Some(true)),
    )
    .send(&reqwest::Client::new())
    .await
    .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/event-stream");

    let (chunks, content) = read_chat_completion_response(response).await.unwrap();
    assert_eq!(chunks.len(), 4);
    assert_eq!(content, "1, 2, 3");
    let usage = extract_token_usage(&chunks);
    assert_eq!(usage.prompt_tokens, 11);
    assert_eq!(usage.completion_tokens, 5);
    assert_eq!(usage.total_tokens, 16);
}

#[tokio::test]
async fn test_streaming_body_keeps_event_framing() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let body = CassetteRequest::new(
        &server.base_url,
        "chat-streaming",
        chat("gpt-4o-mini", "Count to 3", Some(true)),
    )
    .send(&reqwest::Client::new())
    .await
    .unwrap()
    .text()
    .await
    .unwrap();

    let events: Vec<&str> = body.split_terminator("\n\n").collect();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.starts_with("data: ")));
    assert_eq!(events[4], "data: [DONE]");
    assert!(body.ends_with("\n\n"));
}

#[tokio::test]
async fn test_nested_and_azure_cassettes() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;
    let client = reqwest::Client::new();

    let embeddings = CassetteRequest::new(
        &server.base_url,
        "embeddings/basic",
        RequestBody::Embeddings(EmbeddingsRequest {
            model: "text-embedding-3-small".to_string(),
            input: Value::String("hello".to_string()),
            extra: Map::new(),
        }),
    )
    .send(&client)
    .await
    .unwrap();
    assert_eq!(embeddings.status(), 200);
    let body: Value = embeddings.json().await.unwrap();
    assert_eq!(body["data"][0]["embedding"], json!([0.1, 0.2]));

    let azure = CassetteRequest::new(
        &server.base_url,
        "azure-chat",
        chat("gpt-4o", "Hello from Azure", None),
    );
    assert_eq!(azure.path(), "/openai/deployments/gpt-4o/chat/completions");
    let response = azure.send(&client).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], "chatcmpl-azure");
}

#[tokio::test]
async fn test_azure_query_is_ignored_for_deployment_urls() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;

    let response = reqwest::Client::new()
        .post(format!(
            "{}/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21",
            server.base_url
        ))
        .header("content-type", "application/json")
        .header("api-key", "caller-key")
        .body(r#"{"messages":[{"role":"user","content":"Hello from Azure"}],"model":"gpt-4o"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_health_endpoints_and_metrics() {
    let dir = cassette_dir(&fixtures::all());
    let server = spawn_server(dir.path(), UpstreamCredentials::none()).await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/healthz", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    let ready: Value = client
        .get(format!("{}/readyz", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ready["cassettes"], 4);

    CassetteRequest::new(&server.base_url, "chat-basic", chat("m", "Hello!", None))
        .send(&client)
        .await
        .unwrap();
    CassetteRequest::new(&server.base_url, "chat-basic", chat("m", "Nope", None))
        .send(&client)
        .await
        .unwrap();

    let metrics = client
        .get(format!("{}/metrics", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains(r#"tapedeck_replays_total{outcome="replayed"} 1"#));
    assert!(metrics.contains(r#"tapedeck_misses_total{kind="interaction_out_of_date"} 1"#));
}

#[test]
fn test_malformed_cassette_aborts_startup() {
    let dir = cassette_dir(&[
        ("chat-basic", fixtures::CHAT_BASIC),
        ("broken/chat", "interactions:\n  - request: [unterminated\n"),
    ]);

    let err = tapedeck_server::build_app(&test_config(dir.path()), UpstreamCredentials::none())
        .err()
        .unwrap();
    let message = format!("{:#}", err);
    assert!(message.contains("Malformed cassette"), "{}", message);
    assert!(message.contains("broken/chat.yaml"), "{}", message);
}

#[test]
fn test_every_duration_format_loads() {
    let dir = cassette_dir(&fixtures::all());
    let store = tapedeck_server::load_store(dir.path()).unwrap();

    let durations: Vec<_> = store
        .interactions()
        .map(|(name, i)| (name.to_string(), i.response.duration))
        .collect();
    assert_eq!(durations.len(), 4);
    for (name, duration) in durations {
        let expected = match name.as_str() {
            "chat-basic" => 1_500,
            "chat-streaming" => 500,
            "embeddings/basic" => 1_203,
            "azure-chat" => 62_300,
            other => panic!("unexpected cassette {}", other),
        };
        assert_eq!(duration.unwrap().as_millis(), expected, "{}", name);
    }
}
