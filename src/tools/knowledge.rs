// src/tools/knowledge.rs

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{string_arg, ToolHandler};
use crate::llm::ToolDefinition;
use crate::rag::RetrievalService;

pub const KNOWLEDGE_TOOL_NAME: &str = "search_knowledge_base";

/// Lets the model look up the user's own notes
pub struct KnowledgeBaseTool {
    retrieval: RetrievalService,
    top_k: usize,
}

impl KnowledgeBaseTool {
    pub fn new(retrieval: RetrievalService, top_k: usize) -> Self {
        Self { retrieval, top_k }
    }
}

#[async_trait]
impl ToolHandler for KnowledgeBaseTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: KNOWLEDGE_TOOL_NAME.to_string(),
            description: "Search the user's vault of world-building notes and novel chapters. \
                Use it for questions about their characters, places, lore or plot."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for in the notes"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let query = string_arg(arguments, "query")?;
        let notes = self.retrieval.search(query, self.top_k).await;
        if notes.is_empty() {
            return Ok(Value::String("No relevant notes found.".to_string()));
        }
        Ok(json!(notes))
    }
}
