// src/rag/chunker.rs
// Overlapping word-window chunking

use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size {size} must be greater than overlap {overlap}")]
    InvalidWindow { size: usize, overlap: usize },
}

/// Split `text` into windows of at most `size` whitespace-delimited words.
///
/// Window starts advance by `size - overlap`; the last window may be short.
/// Empty or whitespace-only text yields no chunks.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    if size == 0 || size <= overlap {
        return Err(ChunkError::InvalidWindow { size, overlap });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = size - overlap;

    Ok((0..words.len())
        .step_by(step)
        .map(|start| words[start..(start + size).min(words.len())].join(" "))
        .collect())
}

/// Chunker with a validated window
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 || size <= overlap {
            return Err(ChunkError::InvalidWindow { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        // Window was validated at construction
        chunk_words(text, self.size, self.overlap).unwrap_or_default()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
