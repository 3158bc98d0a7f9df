// src/state.rs
// Composition root: every service is built here and shared through AppState

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chat::ChatOrchestrator;
use crate::config::{LunaConfig, VectorBackend};
use crate::llm::{ChatTransport, Embedder, EmbeddingClient, OllamaChatClient};
use crate::rag::{Chunker, InMemoryIndex, IngestionPipeline, QdrantIndex, RetrievalService, VectorIndex};
use crate::tools::{DuckDuckGoClient, KnowledgeBaseTool, ToolRegistry, WebSearchTool};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LunaConfig>,

    // -------- Backends --------
    pub transport: Arc<dyn ChatTransport>,
    pub index: Arc<dyn VectorIndex>,

    // -------- Services --------
    pub orchestrator: ChatOrchestrator,
    pub ingestion: IngestionPipeline,
    pub retrieval: RetrievalService,

    // -------- Request bookkeeping --------
    pub active: ActiveRequests,
    pub sync_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    /// Wire the real model server and configured vector engine
    pub fn from_config(config: LunaConfig) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn ChatTransport> = Arc::new(OllamaChatClient::new(
            config.ollama_base_url.clone(),
            config.chat_url.clone(),
            config.chat_model.clone(),
        ));
        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(
            config.embed_url.clone(),
            config.embed_model.clone(),
            config.embed_timeout(),
        ));
        let index: Arc<dyn VectorIndex> = match config.vector_backend {
            VectorBackend::Qdrant => Arc::new(QdrantIndex::new(
                config.qdrant_url.clone(),
                config.embedding_dim,
            )),
            VectorBackend::Memory => Arc::new(InMemoryIndex::new()),
        };

        info!(
            "Model: {} | Embeddings: {} | Index: {:?}",
            config.chat_model, config.embed_model, config.vector_backend
        );
        Self::assemble(config, transport, embedder, index)
    }

    /// Build services around already-constructed backends
    pub fn assemble(
        config: LunaConfig,
        transport: Arc<dyn ChatTransport>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let retrieval = RetrievalService::new(embedder.clone(), index.clone());
        let ingestion = IngestionPipeline::new(embedder, index.clone(), chunker);

        let mut tools = ToolRegistry::new()
            .with(Arc::new(KnowledgeBaseTool::new(retrieval.clone(), config.search_top_k)));
        if config.enable_web_search {
            tools.register(Arc::new(WebSearchTool::new(
                DuckDuckGoClient::new(),
                config.web_search_max_results,
            )));
        }
        info!("Tools: {}", tools.names().join(", "));

        let orchestrator = ChatOrchestrator::new(transport.clone(), tools)
            .with_retrieval(retrieval.clone(), config.search_top_k)
            .with_history_limit(config.max_history_messages)
            .with_tools_enabled(config.enable_tools);

        Ok(Self {
            config: Arc::new(config),
            transport,
            index,
            orchestrator,
            ingestion,
            retrieval,
            active: ActiveRequests::default(),
            sync_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }
}

/// Cancellation tokens of in-flight chat requests, by request id
#[derive(Clone, Default)]
pub struct ActiveRequests {
    inner: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl ActiveRequests {
    /// Track a new request until the returned guard is dropped
    pub fn register(&self, id: impl Into<String>) -> RequestGuard {
        let id = id.into();
        let token = CancellationToken::new();
        self.lock().insert(id.clone(), token.clone());
        RequestGuard {
            id,
            token,
            registry: self.clone(),
        }
    }

    /// Returns false when no such request is running
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything in flight; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let active = self.lock();
        for token in active.values() {
            token.cancel();
        }
        active.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        // A poisoned map is still a valid map
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes its request from [`ActiveRequests`] on drop
pub struct RequestGuard {
    id: String,
    token: CancellationToken,
    registry: ActiveRequests,
}

impl RequestGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
