// src/tools/web_search.rs
// Web lookups through the DuckDuckGo instant answer API (no key required)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::info;

use super::{string_arg, ToolHandler};
use crate::llm::ToolDefinition;

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("Search API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("No results found")]
    NoResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

pub struct DuckDuckGoClient {
    http_client: Client,
    endpoint: String,
}

impl DuckDuckGoClient {
    pub fn new() -> Self {
        Self::with_endpoint(DUCKDUCKGO_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Luna/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, WebSearchError> {
        info!("Executing web search: {}", query);

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebSearchError::ApiError(format!(
                "DuckDuckGo API error {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            WebSearchError::ApiError(format!("Failed to parse DuckDuckGo response: {}", e))
        })?;

        let results = parse_instant_answer(&body, max_results);
        if results.is_empty() {
            return Err(WebSearchError::NoResults);
        }
        Ok(results)
    }
}

impl Default for DuckDuckGoClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Abstract first, then related topics; nested topic groups are flattened
fn parse_instant_answer(body: &Value, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = body["AbstractText"].as_str().filter(|s| !s.is_empty()) {
        results.push(SearchResult {
            title: body["Heading"].as_str().unwrap_or("DuckDuckGo Result").to_string(),
            snippet: abstract_text.to_string(),
            url: body["AbstractURL"].as_str().unwrap_or("").to_string(),
        });
    }

    let mut topics: Vec<&Value> = Vec::new();
    if let Some(related) = body["RelatedTopics"].as_array() {
        for topic in related {
            match topic["Topics"].as_array() {
                Some(group) => topics.extend(group.iter()),
                None => topics.push(topic),
            }
        }
    }

    for topic in topics {
        let Some(text) = topic["Text"].as_str().filter(|s| !s.is_empty()) else {
            continue;
        };
        // Related topic text reads "Title - description"
        let title = text.split(" - ").next().unwrap_or(text);
        results.push(SearchResult {
            title: title.to_string(),
            snippet: text.to_string(),
            url: topic["FirstURL"].as_str().unwrap_or("").to_string(),
        });
    }

    results.truncate(max_results);
    results
}

pub struct WebSearchTool {
    client: DuckDuckGoClient,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(client: DuckDuckGoClient, max_results: usize) -> Self {
        Self {
            client,
            max_results,
        }
    }
}

#[async_trait]
impl ToolHandler for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: WEB_SEARCH_TOOL_NAME.to_string(),
            description: "Search the web for factual information the notes do not cover, \
                such as history, science or real places."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query. Be specific and concise."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let query = string_arg(arguments, "query")?;
        let results = self.client.search(query, self.max_results).await?;
        Ok(serde_json::to_value(results)?)
    }
}
