// tests/ollama_client.rs
// Model client against a local fake of the model server

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use luna::llm::{ChatMessage, ChatTransport, Embedder, EmbedError, EmbeddingClient, ModelEvent, OllamaChatClient};

fn ndjson(lines: &[Value]) -> impl IntoResponse + use<> {
    let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
    ([("content-type", "application/x-ndjson")], body)
}

async fn plain() -> impl IntoResponse {
    ndjson(&[
        json!({"message": {"role": "assistant", "content": "Hel"}, "done": false}),
        json!({"message": {"role": "assistant", "content": "lo"}, "done": false}),
        json!({"message": {"role": "assistant", "content": ""}, "done": true}),
    ])
}

async fn with_tools() -> impl IntoResponse {
    ndjson(&[
        json!({"message": {"role": "assistant", "content": "", "thinking": "need notes"}, "done": false}),
        json!({"message": {"role": "assistant", "content": "", "tool_calls": [
            {"function": {"name": "search_knowledge_base", "arguments": {"query": "Vell"}}}
        ]}, "done": false}),
        json!({"message": {"role": "assistant", "content": ""}, "done": true}),
    ])
}

async fn server_error_line() -> impl IntoResponse {
    ndjson(&[
        json!({"message": {"role": "assistant", "content": "Par"}, "done": false}),
        json!({"error": "model 'nope' not found"}),
    ])
}

async fn http_failure() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "out of memory")
}

async fn no_done_marker() -> impl IntoResponse {
    ndjson(&[json!({"message": {"role": "assistant", "content": "cut"}, "done": false})])
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    ndjson(&[])
}

async fn embeddings(Json(body): Json<Value>) -> impl IntoResponse {
    match body["prompt"].as_str() {
        Some("fail") => (StatusCode::BAD_GATEWAY, Json(json!({"error": "boom"}))),
        Some("empty") => (StatusCode::OK, Json(json!({"embedding": []}))),
        _ => (StatusCode::OK, Json(json!({"embedding": [0.5, 0.25, 0.125]}))),
    }
}

async fn tags() -> impl IntoResponse {
    Json(json!({"models": [{"name": "llama3.2"}]}))
}

/// Starts the fake and returns its base URL
async fn spawn_fake() -> String {
    let app = Router::new()
        .route("/chat/plain", post(plain))
        .route("/chat/tools", post(with_tools))
        .route("/chat/error", post(server_error_line))
        .route("/chat/500", post(http_failure))
        .route("/chat/no-done", post(no_done_marker))
        .route("/chat/slow", post(slow))
        .route("/api/embeddings", post(embeddings))
        .route("/api/tags", get(tags));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn chat(base: &str, path: &str) -> Vec<ModelEvent> {
    let client = OllamaChatClient::new(base, format!("{base}{path}"), "llama3.2");
    client
        .stream_chat(vec![ChatMessage::user("hi")], None, CancellationToken::new())
        .collect()
        .await
}

#[tokio::test]
async fn chunks_arrive_in_order_then_done() {
    let base = spawn_fake().await;
    let events = chat(&base, "/chat/plain").await;
    assert_eq!(
        events,
        vec![
            ModelEvent::Chunk("Hel".into()),
            ModelEvent::Chunk("lo".into()),
            ModelEvent::Done
        ]
    );
}

#[tokio::test]
async fn tool_calls_are_collected_before_done() {
    let base = spawn_fake().await;
    let events = chat(&base, "/chat/tools").await;

    assert_eq!(events.len(), 3, "{events:?}");
    assert_eq!(events[0], ModelEvent::Thought("need notes".into()));
    match &events[1] {
        ModelEvent::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].name, "search_knowledge_base");
            assert_eq!(calls[0].arguments["query"], "Vell");
        }
        other => panic!("expected tool calls, got {other:?}"),
    }
    assert_eq!(events[2], ModelEvent::Done);
}

#[tokio::test]
async fn error_line_ends_the_round() {
    let base = spawn_fake().await;
    let events = chat(&base, "/chat/error").await;
    assert_eq!(
        events,
        vec![
            ModelEvent::Chunk("Par".into()),
            ModelEvent::Error("model 'nope' not found".into())
        ]
    );
}

#[tokio::test]
async fn http_status_failure_is_an_error_event() {
    let base = spawn_fake().await;
    let events = chat(&base, "/chat/500").await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        ModelEvent::Error(message) => {
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("out of memory"), "{message}");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn body_without_done_marker_still_finishes() {
    let base = spawn_fake().await;
    let events = chat(&base, "/chat/no-done").await;
    assert_eq!(events, vec![ModelEvent::Chunk("cut".into()), ModelEvent::Done]);
}

#[tokio::test]
async fn unreachable_server_is_an_error_event() {
    // Port 9 (discard) on localhost is closed in test environments
    let client = OllamaChatClient::new("http://127.0.0.1:9", "http://127.0.0.1:9/api/chat", "llama3.2");
    let events: Vec<ModelEvent> = client
        .stream_chat(vec![ChatMessage::user("hi")], None, CancellationToken::new())
        .collect()
        .await;
    assert!(matches!(events.as_slice(), [ModelEvent::Error(_)]), "{events:?}");
    assert!(!client.ping().await);
}

#[tokio::test]
async fn cancelling_a_pending_request_stops_it() {
    let base = spawn_fake().await;
    let client = OllamaChatClient::new(&base, format!("{base}/chat/slow"), "llama3.2");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let events: Vec<ModelEvent> = tokio::time::timeout(
        Duration::from_secs(5),
        client
            .stream_chat(vec![ChatMessage::user("hi")], None, cancel)
            .collect(),
    )
    .await
    .expect("cancellation did not interrupt the request");
    assert_eq!(events, vec![ModelEvent::Stopped]);
}

#[tokio::test]
async fn ping_reports_a_live_server() {
    let base = spawn_fake().await;
    let client = OllamaChatClient::new(&base, format!("{base}/api/chat"), "llama3.2");
    assert!(client.ping().await);
}

#[tokio::test]
async fn embedding_client_maps_failures_to_none() {
    let base = spawn_fake().await;
    let client = EmbeddingClient::new(
        format!("{base}/api/embeddings"),
        "nomic-embed-text",
        Duration::from_secs(5),
    );

    assert_eq!(client.embed("dragons").await, Some(vec![0.5, 0.25, 0.125]));
    assert_eq!(client.embed("fail").await, None);
    assert_eq!(client.embed("empty").await, None);

    match client.try_embed("fail").await {
        Err(EmbedError::Status { status, .. }) => assert_eq!(status, 502),
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(matches!(client.try_embed("empty").await, Err(EmbedError::Empty)));
}
