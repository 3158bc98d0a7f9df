// src/llm/mod.rs
// Model server access: message types, embeddings and the streaming chat transport

pub mod embedding;
pub mod ndjson;
pub mod ollama;
pub mod types;

pub use embedding::{cosine_similarity, EmbedError, Embedder, EmbeddingClient};
pub use ollama::{ChatTransport, ModelEvent, ModelStream, OllamaChatClient};
pub use types::{ChatMessage, Role, ToolCall, ToolDefinition};
