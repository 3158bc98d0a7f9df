// src/chat/mod.rs

pub mod events;
pub mod mood;
pub mod orchestrator;
pub mod prompt;

pub use events::StreamEvent;
pub use mood::{LexiconMood, Mood, MoodClassifier};
pub use orchestrator::{ChatOrchestrator, ChatRequest, ToolResult};
pub use prompt::{build_messages, HistoryEntry, SYSTEM_PROMPT};
