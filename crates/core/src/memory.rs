//! Memory seams — collaborators that contribute text to the prompt.
//!
//! The execution loop never owns long-term state. It asks an optional
//! [`ContextProvider`] for extra text before the first model call and hands
//! it the finished exchange afterwards. Whatever the provider keeps between
//! runs (entity summaries, chat history) lives behind its own store.

use async_trait::async_trait;
use crate::error::MemoryError;

/// Supplies additional prompt context for a task input.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The provider name (e.g., "entity").
    fn name(&self) -> &str;

    /// Text to splice into the prompt before the trajectory. May be empty.
    async fn load_context(&self, input: &str) -> std::result::Result<String, MemoryError>;

    /// Record a completed exchange.
    async fn save_context(&self, input: &str, output: &str) -> std::result::Result<(), MemoryError>;

    /// Forget everything.
    async fn clear(&self) -> std::result::Result<(), MemoryError>;
}

/// A key-value store for entity summaries.
///
/// Injected into memory collaborators so tests and deployments can swap the
/// storage without touching summarization logic.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get the value for `key`, if present.
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, MemoryError>;

    /// Set `key` to `value`, replacing any existing value.
    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), MemoryError>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, MemoryError>;

    /// Whether `key` is present.
    async fn exists(&self, key: &str) -> std::result::Result<bool, MemoryError>;

    /// Remove every key.
    async fn clear(&self) -> std::result::Result<(), MemoryError>;
}
