//! In-memory entity store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use agentloop_core::error::MemoryError;
use agentloop_core::memory::EntityStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An entity store backed by a `HashMap`.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get(&self, key: &str) -> Result<Option<String>, MemoryError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), MemoryError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}
