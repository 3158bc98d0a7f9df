// src/rag/search.rs
// Note retrieval across both collections

use std::sync::Arc;

use tracing::{debug, warn};

use super::index::{Category, VectorIndex};
use crate::llm::Embedder;

/// Upper bound on snippets handed to the prompt, whatever `top_k` is
pub const MAX_CONTEXT_SNIPPETS: usize = 4;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Clone)]
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Up to four distinct note texts, world hits first, then novel hits.
    ///
    /// Never fails: an unembeddable query gives an empty list and a collection
    /// that cannot be queried contributes nothing.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<String> {
        let Some(vector) = self.embedder.embed(query).await else {
            debug!("Query could not be embedded, returning no notes");
            return Vec::new();
        };

        let mut results: Vec<String> = Vec::new();
        for category in Category::ALL {
            let hits = match self.index.query(category, &vector, top_k).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Search in {} failed: {:#}", category.collection(), e);
                    continue;
                }
            };

            for hit in hits {
                let clean = hit.document.trim();
                if !clean.is_empty() && !results.iter().any(|r| r == clean) {
                    results.push(clean.to_string());
                }
            }
        }

        results.truncate(MAX_CONTEXT_SNIPPETS);
        results
    }
}
