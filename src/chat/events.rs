// src/chat/events.rs

use serde::{Deserialize, Serialize};

use super::mood::Mood;

/// Events of one chat response, in emission order.
///
/// Every sequence starts with `Mood` and ends with exactly one of `Done`,
/// `Error` or `Stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Mood { content: Mood },
    Chunk { content: String },
    Thought { content: String },
    Done,
    Error { content: String },
    Stop,
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
        }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        StreamEvent::Thought {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: content.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Done | StreamEvent::Error { .. } | StreamEvent::Stop
        )
    }

    /// One NDJSON line, newline included
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","content":"event encoding failed"}"#.to_string());
        line.push('\n');
        line
    }
}
