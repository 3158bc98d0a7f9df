// src/lib.rs

pub mod api;
pub mod chat;
pub mod config;
pub mod llm;
pub mod rag;
pub mod state;
pub mod tools;

pub use config::LunaConfig;
pub use state::AppState;
