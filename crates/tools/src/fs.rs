//! File tools — `read_file` and `write_file` over a [`FileStore`].

use std::sync::Arc;

use async_trait::async_trait;
use agentloop_core::error::ToolError;
use agentloop_core::tool::Tool;
use serde::Deserialize;
use tracing::debug;

use crate::file_store::FileStore;

pub struct ReadFileTool {
    store: Arc<dyn FileStore>,
}

impl ReadFileTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct ReadInput {
    file_path: String,
}

/// Accepts either a bare path or `{"file_path": "..."}`.
fn read_path(input: &str) -> Result<String, ToolError> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        let parsed: ReadInput = serde_json::from_str(trimmed)
            .map_err(|e| ToolError::InvalidInput(format!("Expected {{\"file_path\": ...}}: {e}")))?;
        return Ok(parsed.file_path);
    }
    Ok(trimmed.trim_matches('"').to_string())
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file from disk. Input is the file path."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let path = read_path(input)?;
        debug!(path = %path, "Reading file");
        self.store.read_file(&path).await
    }
}

pub struct WriteFileTool {
    store: Arc<dyn FileStore>,
}

impl WriteFileTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct WriteInput {
    file_path: String,
    text: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write file to disk. Input is JSON: {\"file_path\": \"<path>\", \"text\": \"<contents>\"}."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let parsed: WriteInput = serde_json::from_str(input.trim()).map_err(|e| {
            ToolError::InvalidInput(format!(
                "Expected {{\"file_path\": ..., \"text\": ...}}: {e}"
            ))
        })?;
        debug!(path = %parsed.file_path, bytes = parsed.text.len(), "Writing file");
        self.store.write_file(&parsed.file_path, &parsed.text).await?;
        Ok("File written to successfully.".into())
    }
}
