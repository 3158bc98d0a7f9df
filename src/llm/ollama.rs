// src/llm/ollama.rs
// Streaming chat against an Ollama-compatible /api/chat endpoint

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ndjson::ndjson_stream;
use super::types::{ChatMessage, ToolCall, ToolDefinition};

/// What one streaming round produces, in order.
///
/// `ToolCalls` is emitted at most once, after all text, and only for rounds
/// that end normally. Every round ends with exactly one of `Done`, `Stopped`
/// or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    Chunk(String),
    Thought(String),
    ToolCalls(Vec<ToolCall>),
    Done,
    Stopped,
    Error(String),
}

pub type ModelStream = Pin<Box<dyn Stream<Item = ModelEvent> + Send>>;

/// One streaming chat round. Implementations must not panic or return early
/// without a terminal event.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        cancel: CancellationToken,
    ) -> ModelStream;

    /// True when the model server answers at all
    async fn ping(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
}

#[derive(Debug, Deserialize)]
struct ChatFragment {
    #[serde(default)]
    message: Option<FragmentMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FragmentMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Clone)]
pub struct OllamaChatClient {
    client: Client,
    base_url: String,
    chat_url: String,
    model: String,
}

impl OllamaChatClient {
    pub fn new(
        base_url: impl Into<String>,
        chat_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            chat_url: chat_url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatTransport for OllamaChatClient {
    async fn ping(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Model server ping failed: {}", e);
                false
            }
        }
    }

    fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        cancel: CancellationToken,
    ) -> ModelStream {
        let client = self.client.clone();
        let url = self.chat_url.clone();
        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
            tools,
        };

        Box::pin(stream! {
            info!(
                "Opening chat stream: {} messages, tools {}",
                body.messages.len(),
                if body.tools.is_some() { "on" } else { "off" }
            );

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = client.post(&url).json(&body).send() => Some(r),
            };

            let response = match sent {
                None => {
                    yield ModelEvent::Stopped;
                    return;
                }
                Some(Err(e)) => {
                    yield ModelEvent::Error(format!("Model server request failed: {e}"));
                    return;
                }
                Some(Ok(response)) => response,
            };

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_else(|_| "<no body>".into());
                yield ModelEvent::Error(format!("Model server error ({status}): {error_text}"));
                return;
            }

            let fragments = ndjson_stream::<ChatFragment, _>(response.bytes_stream());
            tokio::pin!(fragments);

            let mut tool_calls: Vec<ToolCall> = Vec::new();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    f = fragments.next() => Some(f),
                };

                let fragment = match next {
                    None => {
                        debug!("Chat stream cancelled");
                        yield ModelEvent::Stopped;
                        return;
                    }
                    Some(None) => {
                        warn!("Chat stream ended without a done marker");
                        break;
                    }
                    Some(Some(Err(e))) => {
                        yield ModelEvent::Error(e.to_string());
                        return;
                    }
                    Some(Some(Ok(fragment))) => fragment,
                };

                if let Some(error) = fragment.error {
                    yield ModelEvent::Error(error);
                    return;
                }

                if let Some(message) = fragment.message {
                    if let Some(thinking) = message.thinking.filter(|t| !t.is_empty()) {
                        yield ModelEvent::Thought(thinking);
                    }
                    if !message.content.is_empty() {
                        yield ModelEvent::Chunk(message.content);
                    }
                    if let Some(calls) = message.tool_calls {
                        debug!("Model requested {} tool call(s)", calls.len());
                        tool_calls.extend(calls);
                    }
                }

                if fragment.done {
                    break;
                }
            }

            if !tool_calls.is_empty() {
                yield ModelEvent::ToolCalls(tool_calls);
            }
            yield ModelEvent::Done;
        })
    }
}
