//! SerpAPI search tool — Google results condensed to a single answer string.
//!
//! The self-ask policy registers this under the name "Intermediate Answer";
//! elsewhere it is called "search".

use async_trait::async_trait;
use agentloop_core::error::ToolError;
use agentloop_core::tool::Tool;
use serde_json::Value;
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://serpapi.com/search";
const NO_RESULT: &str = "No good search result found";

pub struct SerpApiTool {
    name: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl SerpApiTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            name: "search".into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Register the tool under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Pull the most answer-like text out of a SerpAPI response.
pub fn extract_answer(body: &Value) -> Result<String, String> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(error.to_string());
    }

    let answer_box = &body["answer_box"];
    if let Some(answer) = answer_box["answer"].as_str() {
        return Ok(answer.to_string());
    }
    if let Some(snippet) = answer_box["snippet"].as_str() {
        return Ok(snippet.to_string());
    }
    if let Some(word) = answer_box["snippet_highlighted_words"][0].as_str() {
        return Ok(word.to_string());
    }
    if let Some(spotlight) = body["sports_results"].get("game_spotlight") {
        return Ok(match spotlight.as_str() {
            Some(s) => s.to_string(),
            None => spotlight.to_string(),
        });
    }
    if let Some(description) = body["knowledge_graph"]["description"].as_str() {
        return Ok(description.to_string());
    }
    if let Some(snippet) = body["organic_results"][0]["snippet"].as_str() {
        return Ok(snippet.to_string());
    }
    Ok(NO_RESULT.to_string())
}

#[async_trait]
impl Tool for SerpApiTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A search engine. Useful for when you need to answer questions about current events. Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: "SerpAPI key not configured (set SERPAPI_API_KEY)".into(),
            })?;

        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason,
        };

        let query = [("engine", "google"), ("q", input.trim()), ("api_key", api_key)];

        debug!(tool = %self.name, query = %input.trim(), "SerpAPI search");
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| failed(format!("Request failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| failed(format!("Invalid response body: {e}")))?;

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            warn!(status = status.as_u16(), "SerpAPI returned an error");
            return Err(failed(format!("HTTP {}: {message}", status.as_u16())));
        }

        extract_answer(&body).map_err(failed)
    }
}
