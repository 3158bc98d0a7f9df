// src/chat/orchestrator.rs
// Chat rounds with tool calling: one initial round, at most one follow-up

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::StreamEvent;
use super::mood::{LexiconMood, MoodClassifier};
use super::prompt::{build_messages, HistoryEntry, SYSTEM_PROMPT};
use crate::llm::{ChatMessage, ChatTransport, ModelEvent, ToolCall};
use crate::rag::RetrievalService;
use crate::rag::search::DEFAULT_TOP_K;
use crate::tools::ToolRegistry;

fn default_true() -> bool {
    true
}

/// Body of a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Prepend matching vault notes before the first round
    #[serde(default)]
    pub augment: bool,
    /// Offer tools in the first round (still subject to server config)
    #[serde(default = "default_true")]
    pub tools: bool,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            augment: false,
            tools: true,
        }
    }
}

/// Output of one tool call, fed back to the model as a `tool` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub name: String,
    pub content: String,
}

impl ToolResult {
    fn into_message(self) -> ChatMessage {
        ChatMessage::tool_result(self.name, self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Initial,
    FollowUp,
}

enum RoundEnd {
    Finished { text: String, calls: Vec<ToolCall> },
    Stopped,
    Failed(String),
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    transport: Arc<dyn ChatTransport>,
    tools: ToolRegistry,
    retrieval: Option<RetrievalService>,
    mood: Arc<dyn MoodClassifier>,
    system_prompt: String,
    max_history: usize,
    top_k: usize,
    tools_enabled: bool,
}

impl ChatOrchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>, tools: ToolRegistry) -> Self {
        Self {
            transport,
            tools,
            retrieval: None,
            mood: Arc::new(LexiconMood),
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_history: 10,
            top_k: DEFAULT_TOP_K,
            tools_enabled: true,
        }
    }

    /// Used for `augment` requests
    pub fn with_retrieval(mut self, retrieval: RetrievalService, top_k: usize) -> Self {
        self.retrieval = Some(retrieval);
        self.top_k = top_k;
        self
    }

    pub fn with_mood(mut self, mood: Arc<dyn MoodClassifier>) -> Self {
        self.mood = mood;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history_limit(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    /// Answer one request as an ordered event stream.
    ///
    /// The stream starts with a mood event and ends with exactly one of
    /// done, error or stop. Once `cancel` fires no further chunk is emitted
    /// and the stream ends with stop, even if an error follows.
    pub fn run(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let this = self.clone();

        stream! {
            yield StreamEvent::Mood { content: this.mood.classify(&request.prompt) };

            let notes = match (&this.retrieval, request.augment) {
                (Some(retrieval), true) => {
                    let found = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        notes = retrieval.search(&request.prompt, this.top_k) => Some(notes),
                    };
                    match found {
                        Some(notes) => notes,
                        None => {
                            yield StreamEvent::Stop;
                            return;
                        }
                    }
                }
                _ => Vec::new(),
            };
            if !notes.is_empty() {
                debug!("Augmenting prompt with {} notes", notes.len());
            }

            let mut messages = build_messages(
                &this.system_prompt,
                &request.history,
                this.max_history,
                &notes,
                &request.prompt,
            );
            let offer_tools = this.tools_enabled && request.tools && !this.tools.is_empty();
            let mut round = Round::Initial;

            loop {
                if cancel.is_cancelled() {
                    yield StreamEvent::Stop;
                    return;
                }

                // The follow-up never offers tools, so it cannot ask for another round
                let tools = match round {
                    Round::Initial if offer_tools => Some(this.tools.definitions()),
                    _ => None,
                };
                info!("Starting {:?} round", round);

                let mut model = this.transport.stream_chat(messages.clone(), tools, cancel.clone());
                let mut text = String::new();
                let mut calls: Vec<ToolCall> = Vec::new();
                let mut end: Option<RoundEnd> = None;

                while let Some(event) = model.next().await {
                    match event {
                        ModelEvent::Chunk(content) => {
                            if cancel.is_cancelled() {
                                end = Some(RoundEnd::Stopped);
                                break;
                            }
                            text.push_str(&content);
                            yield StreamEvent::Chunk { content };
                        }
                        ModelEvent::Thought(content) => {
                            if !cancel.is_cancelled() {
                                yield StreamEvent::Thought { content };
                            }
                        }
                        ModelEvent::ToolCalls(requested) => calls.extend(requested),
                        ModelEvent::Done => break,
                        ModelEvent::Stopped => {
                            end = Some(RoundEnd::Stopped);
                            break;
                        }
                        ModelEvent::Error(message) => {
                            end = Some(RoundEnd::Failed(message));
                            break;
                        }
                    }
                }
                drop(model);

                let end = end.unwrap_or(RoundEnd::Finished { text, calls });
                if cancel.is_cancelled() {
                    yield StreamEvent::Stop;
                    return;
                }

                let (text, calls) = match end {
                    RoundEnd::Finished { text, calls } => (text, calls),
                    RoundEnd::Stopped => {
                        yield StreamEvent::Stop;
                        return;
                    }
                    RoundEnd::Failed(message) => {
                        warn!("Chat round failed: {}", message);
                        yield StreamEvent::Error { content: message };
                        return;
                    }
                };

                if round == Round::FollowUp || calls.is_empty() {
                    if !calls.is_empty() {
                        warn!("Ignoring {} tool call(s) requested in the follow-up round", calls.len());
                    }
                    yield StreamEvent::Done;
                    return;
                }

                let mut results: Vec<ToolResult> = Vec::with_capacity(calls.len());
                for call in &calls {
                    yield StreamEvent::thought(format!("Consulting {}", call.name));
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        content = this.tools.dispatch(call) => Some(content),
                    };
                    match outcome {
                        Some(content) => results.push(ToolResult { name: call.name.clone(), content }),
                        None => {
                            yield StreamEvent::Stop;
                            return;
                        }
                    }
                }

                messages.push(ChatMessage::assistant_with_calls(text, calls));
                messages.extend(results.into_iter().map(ToolResult::into_message));
                round = Round::FollowUp;
            }
        }
    }
}
