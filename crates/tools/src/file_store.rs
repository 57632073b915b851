//! File stores — where the file tools read and write.
//!
//! [`LocalFileStore`] confines every path to a root directory;
//! [`InMemoryFileStore`] keeps contents in a map for tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use agentloop_core::error::ToolError;
use tokio::sync::RwLock;

/// Minimal async file access used by the file tools.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<String, ToolError>;
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), ToolError>;
}

/// Files on disk under a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `path` against the root, rejecting anything that would escape it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let raw = Path::new(path.trim());
        if raw.as_os_str().is_empty() {
            return Err(ToolError::InvalidInput("Empty file path".into()));
        }

        let relative = if raw.is_absolute() {
            raw.strip_prefix(&self.root)
                .map_err(|_| denied(path, "path is outside the workspace"))?
        } else {
            raw
        };

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(denied(path, "path traversal detected")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(denied(path, "path is outside the workspace"));
                }
            }
        }
        Ok(resolved)
    }
}

fn denied(path: &str, reason: &str) -> ToolError {
    ToolError::PermissionDenied {
        tool_name: "file_store".into(),
        reason: format!("'{path}': {reason}"),
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("Failed to read {}: {e}", resolved.display()),
            })
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), ToolError> {
        let resolved = self.resolve(path)?;
        let failed = |e: std::io::Error| ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason: format!("Failed to write {}: {e}", resolved.display()),
        };
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
        tokio::fs::write(&resolved, contents).await.map_err(failed)
    }
}

/// Files kept in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileStore {
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn read_file(&self, path: &str) -> Result<String, ToolError> {
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("File not found: {path}"),
            })
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), ToolError> {
        self.files
            .write()
            .await
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }
}
