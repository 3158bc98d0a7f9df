// src/rag/sync.rs
// Full rebuild of the vault index with live progress events

use std::path::PathBuf;
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::chunker::Chunker;
use super::index::{EntryMetadata, IndexEntry, VectorIndex};
use super::vault::{classify, Vault, VaultFile};
use crate::llm::Embedder;

/// Progress reported while a sync runs.
///
/// A run that reaches the file loop always ends with `Done`; a run that cannot
/// prepare the index ends with a single `Error` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncEvent {
    Progress {
        file: String,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        message: String,
    },
    Done {
        total: usize,
    },
}

impl SyncEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncEvent::Done { .. } | SyncEvent::Error { file: None, .. })
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, chunker: Chunker) -> Self {
        Self {
            embedder,
            index,
            chunker,
        }
    }

    /// Drop and rebuild both collections from the documents under `root`.
    ///
    /// Lazy: nothing happens until the stream is polled.
    pub fn sync(&self, root: impl Into<PathBuf>) -> impl Stream<Item = SyncEvent> + Send + 'static {
        let pipeline = self.clone();
        let vault = Vault::new(root);

        stream! {
            info!("Syncing vault at {}", vault.root().display());

            if let Err(e) = pipeline.index.ping().await {
                error!("Vector index unavailable: {:#}", e);
                yield SyncEvent::Error { file: None, message: format!("Vector index not available: {e:#}") };
                return;
            }

            let entries = match tokio::task::spawn_blocking(move || vault.scan()).await {
                Ok(Ok(entries)) => entries,
                Ok(Err(e)) => {
                    error!("Vault walk failed: {:#}", e);
                    yield SyncEvent::Error { file: None, message: format!("Vault walk failed: {e:#}") };
                    return;
                }
                Err(e) => {
                    yield SyncEvent::Error { file: None, message: format!("Vault walk failed: {e}") };
                    return;
                }
            };

            // The vault is read before anything is deleted
            if let Err(e) = pipeline.reset_collections().await {
                error!("Failed to reset collections: {:#}", e);
                yield SyncEvent::Error { file: None, message: format!("Failed to reset index: {e:#}") };
                return;
            }

            // Every entry ends as exactly one progress or error event
            let mut total = 0usize;
            for entry in entries {
                total += 1;
                let file = match entry {
                    Ok(file) => file,
                    Err(skipped) => {
                        yield SyncEvent::Error {
                            message: format!("Could not read {}: {}", skipped.rel_path, skipped.reason),
                            file: Some(skipped.rel_path),
                        };
                        continue;
                    }
                };
                match pipeline.ingest_file(&file).await {
                    Ok(stored) => {
                        debug!("Indexed {} ({} chunks)", file.rel_path, stored);
                        yield SyncEvent::Progress { file: file.rel_path };
                    }
                    Err(e) => {
                        error!("Error processing {}: {:#}", file.rel_path, e);
                        yield SyncEvent::Error {
                            message: format!("Error in {}: {e:#}", file.rel_path),
                            file: Some(file.rel_path),
                        };
                    }
                }
            }

            info!("Vault sync finished: {} files", total);
            yield SyncEvent::Done { total };
        }
    }

    async fn reset_collections(&self) -> anyhow::Result<()> {
        self.index.delete_collections().await?;
        self.index.ensure_collections().await
    }

    /// Returns how many chunks were stored
    async fn ingest_file(&self, file: &VaultFile) -> anyhow::Result<usize> {
        let category = classify(&file.rel_path);
        let text = tokio::fs::read_to_string(&file.path).await?;

        let mut entries = Vec::new();
        for (idx, chunk) in self.chunker.chunk(&text).into_iter().enumerate() {
            match self.embedder.embed(&chunk).await {
                Some(vector) => entries.push(IndexEntry {
                    id: IndexEntry::chunk_id(&file.rel_path, idx),
                    vector,
                    document: chunk,
                    metadata: EntryMetadata {
                        source: file.rel_path.clone(),
                        category,
                    },
                }),
                None => warn!("Dropping chunk {} of {}: no embedding", idx, file.rel_path),
            }
        }

        let stored = entries.len();
        if stored > 0 {
            self.index.upsert(category, entries).await?;
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_use_status_tag() {
        let progress = serde_json::to_value(SyncEvent::Progress { file: "a.md".into() }).unwrap();
        assert_eq!(progress, json!({"status": "progress", "file": "a.md"}));

        let fatal = SyncEvent::Error { file: None, message: "down".into() };
        assert_eq!(serde_json::to_value(&fatal).unwrap(), json!({"status": "error", "message": "down"}));
        assert!(fatal.is_terminal());

        let done = serde_json::to_value(SyncEvent::Done { total: 3 }).unwrap();
        assert_eq!(done, json!({"status": "done", "total": 3}));
    }

    #[test]
    fn per_file_error_is_not_terminal() {
        let event = SyncEvent::Error { file: Some("b.md".into()), message: "bad".into() };
        assert!(!event.is_terminal());
    }
}
