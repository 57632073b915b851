//! Entity memory — running summaries of the people, places and things a
//! conversation mentions.
//!
//! Before a run the backend is asked which entities the new input refers
//! to; their stored summaries become prompt context. After the run each of
//! those entities gets its summary rewritten with the new exchange folded in.

use std::sync::Arc;

use async_trait::async_trait;
use agentloop_core::error::MemoryError;
use agentloop_core::memory::{ContextProvider, EntityStore};
use agentloop_core::provider::{CompletionRequest, Provider};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const EXTRACTION_TEMPLATE: &str = "You are an assistant that tracks the proper nouns in a conversation.
Extract every proper noun (names of people, places, organizations, works) from the last line of the conversation.
Return them as a single comma-separated list. If there are none, return NONE.

Conversation history:
{history}

Last line:
Human: {input}
Output:";

const SUMMARIZATION_TEMPLATE: &str = "You are an assistant that maintains a short fact sheet about an entity.
Update the summary of \"{entity}\" using only facts stated in the conversation below.
If nothing new is learned, return the existing summary unchanged.

Full conversation history:
{history}

Existing summary of {entity}:
{summary}

Last line:
Human: {input}
Updated summary:";

/// One human/AI exchange.
#[derive(Debug, Clone)]
struct Exchange {
    human: String,
    ai: String,
}

/// A [`ContextProvider`] that keeps per-entity summaries in an [`EntityStore`].
pub struct EntityMemory {
    provider: Arc<dyn Provider>,
    model: String,
    store: Arc<dyn EntityStore>,
    /// Exchanges shown to the extractor and summarizer.
    k: usize,
    human_prefix: String,
    ai_prefix: String,
    history: Mutex<Vec<Exchange>>,
    /// Entities found by the latest `load_context`, updated on save.
    entity_cache: Mutex<Vec<String>>,
}

impl EntityMemory {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            store,
            k: 3,
            human_prefix: "Human".into(),
            ai_prefix: "AI".into(),
            history: Mutex::new(Vec::new()),
            entity_cache: Mutex::new(Vec::new()),
        }
    }

    /// Set how many recent exchanges are considered.
    pub fn with_history_turns(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// The entities found by the most recent `load_context`.
    pub async fn cached_entities(&self) -> Vec<String> {
        self.entity_cache.lock().await.clone()
    }

    async fn buffer_string(&self) -> String {
        let history = self.history.lock().await;
        let start = history.len().saturating_sub(self.k);
        history[start..]
            .iter()
            .map(|ex| {
                format!(
                    "{}: {}\n{}: {}",
                    self.human_prefix, ex.human, self.ai_prefix, ex.ai
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn predict(&self, prompt: String) -> Result<String, MemoryError> {
        let request = CompletionRequest::new(&self.model, prompt);
        let response = self.provider.complete(request).await?;
        Ok(response.text)
    }
}

/// Split the extractor's answer into entity names.
pub fn parse_entities(output: &str) -> Vec<String> {
    let output = output.trim();
    if output.is_empty() || output == "NONE" {
        return Vec::new();
    }
    output
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl ContextProvider for EntityMemory {
    fn name(&self) -> &str {
        "entity"
    }

    async fn load_context(&self, input: &str) -> Result<String, MemoryError> {
        let history = self.buffer_string().await;
        let prompt = EXTRACTION_TEMPLATE
            .replace("{history}", &history)
            .replace("{input}", input);
        let output = self
            .predict(prompt)
            .await
            .map_err(|e| MemoryError::ExtractionFailed(e.to_string()))?;
        let entities = parse_entities(&output);
        debug!(count = entities.len(), "Extracted entities");

        let mut lines = Vec::new();
        for entity in &entities {
            if let Some(summary) = self.store.get(entity).await?
                && !summary.is_empty()
            {
                lines.push(format!("{entity}: {summary}"));
            }
        }
        *self.entity_cache.lock().await = entities;

        let mut context = String::new();
        if !lines.is_empty() {
            context.push_str("Context:\n");
            context.push_str(&lines.join("\n"));
            context.push_str("\n\n");
        }
        if !history.is_empty() {
            context.push_str("Current conversation:\n");
            context.push_str(&history);
            context.push_str("\n\n");
        }
        Ok(context)
    }

    async fn save_context(&self, input: &str, output: &str) -> Result<(), MemoryError> {
        self.history.lock().await.push(Exchange {
            human: input.to_string(),
            ai: output.to_string(),
        });

        let history = self.buffer_string().await;
        let entities = self.entity_cache.lock().await.clone();

        for entity in entities {
            let existing = self.store.get(&entity).await?.unwrap_or_default();
            let prompt = SUMMARIZATION_TEMPLATE
                .replace("{entity}", &entity)
                .replace("{history}", &history)
                .replace("{summary}", &existing)
                .replace("{input}", input);
            match self.predict(prompt).await {
                Ok(summary) => self.store.set(&entity, summary.trim()).await?,
                Err(e) => warn!(entity = %entity, error = %e, "Entity summary update failed"),
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.history.lock().await.clear();
        self.entity_cache.lock().await.clear();
        self.store.clear().await
    }
}
