// src/llm/embedding.rs
// Text embeddings from the model server's embedding endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding endpoint returned an empty vector")]
    Empty,
}

/// Anything that turns text into a fixed-length vector.
///
/// `None` means "no embedding": callers skip the item instead of aborting.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    url: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
            model: model.into(),
        }
    }

    /// Single embedding call with the failure kept typed
    pub async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        debug!("Requesting embedding for {} chars with model {}", text.len(), self.model);

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(EmbedError::Status { status, body });
        }

        let result: EmbeddingResponse = response.json().await?;
        if result.embedding.is_empty() {
            return Err(EmbedError::Empty);
        }
        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.try_embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Embedding failed: {}", e);
                None
            }
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
