// src/rag/index.rs
// Vector index interface shared by every backing engine

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The two partitions of the vault index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    World,
    Novel,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::World, Category::Novel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::World => "world",
            Category::Novel => "novel",
        }
    }

    /// Collection name inside the vector engine
    pub fn collection(&self) -> &'static str {
        match self {
            Category::World => "world_data",
            Category::Novel => "novel_data",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "world" => Some(Category::World),
            "novel" => Some(Category::Novel),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub category: Category,
}

/// One embedded chunk, keyed `<relative-path>_<chunk-ordinal>`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn chunk_id(rel_path: &str, ordinal: usize) -> String {
        format!("{rel_path}_{ordinal}")
    }
}

/// A nearest-neighbour match, best first
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub document: String,
    pub metadata: EntryMetadata,
    pub score: f32,
}

/// Collection-oriented vector store.
///
/// Implementations may be called concurrently; a rebuild running alongside a
/// query may make that query see partial or empty collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Verify the engine is reachable
    async fn ping(&self) -> Result<()>;

    async fn ensure_collections(&self) -> Result<()>;

    /// Drop both collections; a missing collection is not an error
    async fn delete_collections(&self) -> Result<()>;

    /// Insert or replace entries by id, all-or-nothing per call
    async fn upsert(&self, category: Category, entries: Vec<IndexEntry>) -> Result<()>;

    async fn query(&self, category: Category, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;
}
