// src/config/mod.rs
// Runtime configuration loaded from .env and the process environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};

/// Which engine backs the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            other => Err(format!("unknown vector backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LunaConfig {
    // ── Model server
    pub ollama_base_url: String,
    pub chat_url: String,
    pub embed_url: String,
    pub chat_model: String,
    pub embed_model: String,
    pub embedding_dim: u64,
    pub embed_timeout: u64,

    // ── Vector index
    pub vector_backend: VectorBackend,
    pub qdrant_url: String,

    // ── Vault & retrieval
    pub vault_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_top_k: usize,

    // ── Chat
    pub max_history_messages: usize,
    pub enable_tools: bool,
    pub enable_web_search: bool,
    pub web_search_max_results: usize,

    // ── Server
    pub host: String,
    pub port: u16,

    // ── Logging
    pub log_level: String,
}

// Values may carry trailing comments and whitespace (`500 # words`)
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

/// Flags accept 1/0, true/false, yes/no and on/off in any case
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag_or(key: &str, default: bool) -> bool {
    let Ok(val) = std::env::var(key) else {
        return default;
    };
    let clean_val = val.split('#').next().unwrap_or("").trim();
    parse_flag(clean_val).unwrap_or_else(|| {
        eprintln!("Config: {} = '{}' (not a flag, using default)", key, val);
        default
    })
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for LunaConfig {
    fn default() -> Self {
        let base = "http://localhost:11434".to_string();
        Self {
            chat_url: format!("{base}/api/chat"),
            embed_url: format!("{base}/api/embeddings"),
            ollama_base_url: base,
            chat_model: "llama3.2".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            embedding_dim: 768,
            embed_timeout: 10,
            vector_backend: VectorBackend::Qdrant,
            qdrant_url: "http://localhost:6334".to_string(),
            vault_path: None,
            chunk_size: 500,
            chunk_overlap: 50,
            search_top_k: 3,
            max_history_messages: 10,
            enable_tools: true,
            enable_web_search: true,
            web_search_max_results: 3,
            host: "127.0.0.1".to_string(),
            port: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl LunaConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        let d = Self::default();
        let base = env_var_or("OLLAMA_BASE_URL", d.ollama_base_url)
            .trim_end_matches('/')
            .to_string();

        Self {
            chat_url: env_opt("OLLAMA_CHAT_URL").unwrap_or_else(|| format!("{base}/api/chat")),
            embed_url: env_opt("OLLAMA_EMBED_URL")
                .unwrap_or_else(|| format!("{base}/api/embeddings")),
            ollama_base_url: base,
            chat_model: env_var_or("MODEL", d.chat_model),
            embed_model: env_var_or("EMBED_MODEL", d.embed_model),
            embedding_dim: env_var_or("EMBEDDING_DIM", d.embedding_dim),
            embed_timeout: env_var_or("EMBED_TIMEOUT", d.embed_timeout),
            vector_backend: env_var_or("VECTOR_BACKEND", d.vector_backend),
            qdrant_url: env_var_or("QDRANT_URL", d.qdrant_url),
            vault_path: env_opt("VAULT_PATH").map(PathBuf::from),
            chunk_size: env_var_or("CHUNK_SIZE", d.chunk_size),
            chunk_overlap: env_var_or("CHUNK_OVERLAP", d.chunk_overlap),
            search_top_k: env_var_or("SEARCH_TOP_K", d.search_top_k),
            max_history_messages: env_var_or("MAX_HISTORY_MESSAGES", d.max_history_messages),
            enable_tools: env_flag_or("ENABLE_TOOLS", d.enable_tools),
            enable_web_search: env_flag_or("ENABLE_WEB_SEARCH", d.enable_web_search),
            web_search_max_results: env_var_or("WEB_SEARCH_MAX_RESULTS", d.web_search_max_results),
            host: env_var_or("BACKEND_HOST", d.host),
            port: env_var_or("BACKEND_PORT", d.port),
            log_level: env_var_or("LOG_LEVEL", d.log_level),
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size <= self.chunk_overlap {
            bail!(
                "CHUNK_SIZE ({}) must be greater than CHUNK_OVERLAP ({})",
                self.chunk_size,
                self.chunk_overlap
            );
        }
        if self.embedding_dim == 0 {
            bail!("EMBEDDING_DIM must be non-zero");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
