// src/tools/mod.rs
// Tools the model may call during a chat round

pub mod knowledge;
pub mod web_search;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::llm::{ToolCall, ToolDefinition};

pub use knowledge::KnowledgeBaseTool;
pub use web_search::{DuckDuckGoClient, WebSearchError, WebSearchTool};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run with the model-supplied arguments; the value is fed back as JSON text
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value>;
}

/// Name-keyed tool handlers, listed in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        if self.handlers.insert(name.clone(), handler).is_none() {
            self.order.push(name);
        }
    }

    pub fn with(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.definition())
            .collect()
    }

    /// Execute one call. Never fails: unknown tools and handler errors come
    /// back as text for the model to read.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let Some(handler) = self.handlers.get(&call.name) else {
            warn!("Model asked for unknown tool '{}'", call.name);
            return format!("Error: unknown tool '{}'", call.name);
        };

        info!("Running tool {}", call.name);
        match handler.call(&call.arguments).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!("Tool {} failed: {:#}", call.name, e);
                format!("Error running {}: {:#}", call.name, e)
            }
        }
    }
}

/// Required string argument
pub(crate) fn string_arg<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "echo back".into(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn call(&self, arguments: &Map<String, Value>) -> Result<Value> {
            match arguments.get("text") {
                Some(Value::String(s)) => Ok(Value::String(s.clone())),
                Some(other) => Ok(json!({"echo": other})),
                None => anyhow::bail!("nothing to echo"),
            }
        }
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn dispatch_returns_text_for_every_outcome() {
        let registry = ToolRegistry::new().with(Arc::new(Echo));

        assert_eq!(registry.dispatch(&call("echo", json!({"text": "hi"}))).await, "hi");
        assert_eq!(
            registry.dispatch(&call("echo", json!({"text": 5}))).await,
            r#"{"echo":5}"#
        );
        assert_eq!(
            registry.dispatch(&call("echo", json!({}))).await,
            "Error running echo: nothing to echo"
        );
        assert_eq!(
            registry.dispatch(&call("summon", json!({}))).await,
            "Error: unknown tool 'summon'"
        );
    }

    #[test]
    fn registering_twice_keeps_one_definition() {
        let registry = ToolRegistry::new().with(Arc::new(Echo)).with(Arc::new(Echo));
        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.names().to_vec(), vec!["echo".to_string()]);
    }

    #[test]
    fn string_arg_rejects_blank() {
        let args = json!({"query": "  ", "n": 3}).as_object().cloned().unwrap();
        assert!(string_arg(&args, "query").is_err());
        assert!(string_arg(&args, "n").is_err());
    }
}
