// src/rag/mod.rs
// Vault retrieval: chunking, indexing, sync and search

pub mod chunker;
pub mod index;
pub mod memory;
pub mod qdrant;
pub mod search;
pub mod sync;
pub mod vault;

pub use chunker::{chunk_words, ChunkError, Chunker};
pub use index::{Category, EntryMetadata, IndexEntry, QueryHit, VectorIndex};
pub use memory::InMemoryIndex;
pub use qdrant::QdrantIndex;
pub use search::{RetrievalService, MAX_CONTEXT_SNIPPETS};
pub use sync::{IngestionPipeline, SyncEvent};
pub use vault::{classify, SkippedEntry, Vault, VaultFile};
