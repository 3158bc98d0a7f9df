// src/rag/qdrant.rs
// Vector index backed by a Qdrant server

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::index::{Category, EntryMetadata, IndexEntry, QueryHit, VectorIndex};

/// Qdrant-backed index; the gRPC client is built on first use and shared
pub struct QdrantIndex {
    url: String,
    embedding_dim: u64,
    client: OnceCell<Qdrant>,
}

impl QdrantIndex {
    pub fn new(url: impl Into<String>, embedding_dim: u64) -> Self {
        Self {
            url: url.into(),
            embedding_dim,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Qdrant> {
        self.client
            .get_or_try_init(|| async {
                let client = Qdrant::from_url(&self.url)
                    .skip_compatibility_check()
                    .build()
                    .with_context(|| format!("Failed to build Qdrant client for {}", self.url))?;
                info!("Qdrant client ready at {}", self.url);
                Ok::<_, anyhow::Error>(client)
            })
            .await
    }
}

/// Qdrant ids must be integers or UUIDs; chunk ids are arbitrary text
fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, chunk_id.as_bytes()).to_string()
}

fn payload_for(entry: &IndexEntry) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
    payload.insert("chunk_id".to_string(), entry.id.clone().into());
    payload.insert("document".to_string(), entry.document.clone().into());
    payload.insert("source".to_string(), entry.metadata.source.clone().into());
    payload.insert("category".to_string(), entry.metadata.category.as_str().to_string().into());
    payload
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ping(&self) -> Result<()> {
        self.client()
            .await?
            .health_check()
            .await
            .with_context(|| format!("Qdrant at {} is unreachable", self.url))?;
        Ok(())
    }

    async fn ensure_collections(&self) -> Result<()> {
        let qdrant = self.client().await?;
        for category in Category::ALL {
            let name = category.collection();
            if !qdrant.collection_exists(name).await? {
                info!("Creating Qdrant collection: {}", name);
                qdrant
                    .create_collection(
                        CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                            self.embedding_dim,
                            Distance::Cosine,
                        )),
                    )
                    .await
                    .context(format!("Failed to create collection: {}", name))?;
            }
        }
        Ok(())
    }

    async fn delete_collections(&self) -> Result<()> {
        let qdrant = self.client().await?;
        for category in Category::ALL {
            let name = category.collection();
            if qdrant.collection_exists(name).await? {
                qdrant
                    .delete_collection(name)
                    .await
                    .context(format!("Failed to delete collection: {}", name))?;
                debug!("Deleted Qdrant collection: {}", name);
            }
        }
        Ok(())
    }

    async fn upsert(&self, category: Category, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let qdrant = self.client().await?;
        let count = entries.len();

        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|entry| {
                let payload = payload_for(&entry);
                PointStruct::new(point_id(&entry.id), entry.vector, payload)
            })
            .collect();

        qdrant
            .upsert_points(UpsertPointsBuilder::new(category.collection(), points).wait(true))
            .await
            .context("Failed to upsert points")?;

        debug!("Upserted {} points into {}", count, category.collection());
        Ok(())
    }

    async fn query(&self, category: Category, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let qdrant = self.client().await?;

        let results = qdrant
            .search_points(
                SearchPointsBuilder::new(category.collection(), vector.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .with_context(|| format!("Search failed in {}", category.collection()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let document = point.payload.get("document")?.as_str()?.to_string();
                let source = point.payload.get("source")?.as_str()?.to_string();
                let category = point
                    .payload
                    .get("category")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Category::parse(s))
                    .unwrap_or(category);
                Some(QueryHit {
                    document,
                    metadata: EntryMetadata { source, category },
                    score: point.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_stable_uuids() {
        let a = point_id("Novel/ch1.md_0");
        assert_eq!(a, point_id("Novel/ch1.md_0"));
        assert_ne!(a, point_id("Novel/ch1.md_1"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn payload_carries_document_and_metadata() {
        let entry = IndexEntry {
            id: "lore/a.md_2".into(),
            vector: vec![0.1],
            document: "dragons".into(),
            metadata: EntryMetadata {
                source: "lore/a.md".into(),
                category: Category::World,
            },
        };
        let payload = payload_for(&entry);
        assert_eq!(payload["chunk_id"].as_str().map(String::as_str), Some("lore/a.md_2"));
        assert_eq!(payload["category"].as_str().map(String::as_str), Some("world"));
    }
}
