// src/rag/memory.rs
// In-process vector index: brute-force cosine over entries held in memory

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::index::{Category, IndexEntry, QueryHit, VectorIndex};
use crate::llm::cosine_similarity;

/// Entries in insertion order plus an id lookup into them
#[derive(Default)]
struct Collection {
    // Insertion order is kept so equal scores rank deterministically
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

impl Collection {
    fn upsert(&mut self, entry: IndexEntry) {
        match self.positions.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<Category, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a collection, `None` if it does not exist
    pub async fn len(&self, category: Category) -> Option<usize> {
        self.collections.read().await.get(&category).map(|c| c.entries.len())
    }

    /// Every (document, metadata) pair in a collection
    pub async fn documents(&self, category: Category) -> Vec<(String, super::index::EntryMetadata)> {
        self.collections
            .read()
            .await
            .get(&category)
            .map(|collection| {
                collection
                    .entries
                    .iter()
                    .map(|e| (e.document.clone(), e.metadata.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_collections(&self) -> Result<()> {
        let mut collections = self.collections.write().await;
        for category in Category::ALL {
            collections.entry(category).or_default();
        }
        Ok(())
    }

    async fn delete_collections(&self) -> Result<()> {
        self.collections.write().await.clear();
        Ok(())
    }

    async fn upsert(&self, category: Category, entries: Vec<IndexEntry>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(&category)
            .ok_or_else(|| anyhow!("Collection {} does not exist", category.collection()))?;

        for entry in entries {
            collection.upsert(entry);
        }
        debug!("{} now holds {} entries", category.collection(), collection.entries.len());
        Ok(())
    }

    async fn query(&self, category: Category, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(&category)
            .ok_or_else(|| anyhow!("Collection {} does not exist", category.collection()))?;

        let mut scored: Vec<(f32, &IndexEntry)> = collection
            .entries
            .iter()
            .map(|e| (cosine_similarity(vector, &e.vector), e))
            .collect();
        // Stable sort keeps insertion order among ties
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, e)| QueryHit {
                document: e.document.clone(),
                metadata: e.metadata.clone(),
                score,
            })
            .collect())
    }
}
