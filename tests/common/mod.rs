// tests/common/mod.rs
// Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream;
use tokio_util::sync::CancellationToken;

use luna::config::{LunaConfig, VectorBackend};
use luna::llm::{ChatMessage, ChatTransport, Embedder, ModelEvent, ModelStream, ToolCall, ToolDefinition};
use luna::rag::{Category, IndexEntry, QueryHit, VectorIndex};

pub const DIM: usize = 64;

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket
#[derive(Default)]
pub struct HashEmbedder {
    /// Texts containing this marker fail to embed
    pub fail_marker: Option<String>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
        }
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIM as u64) as usize
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return None;
            }
        }
        let mut vector = vec![0.0f32; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            return None;
        }
        Some(vector)
    }
}

/// Embedder that never produces a vector
pub struct NoEmbedder;

#[async_trait]
impl Embedder for NoEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

/// Index whose engine is unreachable
pub struct DownIndex;

#[async_trait]
impl VectorIndex for DownIndex {
    async fn ping(&self) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn ensure_collections(&self) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn delete_collections(&self) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn upsert(&self, _: Category, _: Vec<IndexEntry>) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn query(&self, _: Category, _: &[f32], _: usize) -> Result<Vec<QueryHit>> {
        Err(anyhow!("connection refused"))
    }
}

/// One recorded `stream_chat` call
#[derive(Debug, Clone)]
pub struct RecordedRound {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Plays back one scripted event list per round and records what it was sent.
///
/// Honors cancellation between events like the real client does.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    pub rounds: Arc<Mutex<VecDeque<Vec<ModelEvent>>>>,
    pub calls: Arc<Mutex<Vec<RecordedRound>>>,
    /// Cancel this token once the first chunk has been handed out
    pub cancel_after_first_chunk: Option<CancellationToken>,
}

impl ScriptedTransport {
    pub fn new(rounds: Vec<Vec<ModelEvent>>) -> Self {
        Self {
            rounds: Arc::new(Mutex::new(rounds.into())),
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<RecordedRound> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        cancel: CancellationToken,
    ) -> ModelStream {
        self.calls.lock().unwrap().push(RecordedRound { messages, tools });
        let script = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![ModelEvent::Error("no scripted round left".into())]);
        let trip = self.cancel_after_first_chunk.clone();

        let state = (script.into_iter(), cancel, trip, false, false);
        Box::pin(stream::unfold(
            state,
            |(mut events, cancel, trip, chunk_sent, ended)| async move {
                if ended {
                    return None;
                }
                if let (true, Some(token)) = (chunk_sent, &trip) {
                    token.cancel();
                }
                if cancel.is_cancelled() {
                    return Some((ModelEvent::Stopped, (events, cancel, trip, chunk_sent, true)));
                }
                let event = events.next()?;
                let chunk_sent = chunk_sent || matches!(event, ModelEvent::Chunk(_));
                let terminal = matches!(event, ModelEvent::Done | ModelEvent::Stopped | ModelEvent::Error(_));
                Some((event, (events, cancel, trip, chunk_sent, terminal)))
            },
        ))
    }
}

pub fn chunk(text: &str) -> ModelEvent {
    ModelEvent::Chunk(text.to_string())
}

pub fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        name: name.to_string(),
        arguments: arguments.as_object().cloned().unwrap_or_default(),
    }
}

/// Config for tests: in-memory index, no network tools
pub fn test_config() -> LunaConfig {
    LunaConfig {
        vector_backend: VectorBackend::Memory,
        enable_web_search: false,
        chunk_size: 20,
        chunk_overlap: 5,
        ..LunaConfig::default()
    }
}
