//! Text-completion backends for agentloop.
//!
//! All providers implement the `agentloop_core::Provider` trait.

pub mod openai_compat;
pub mod tokens;

use std::sync::Arc;

use agentloop_config::AppConfig;
use agentloop_core::error::ProviderError;
use agentloop_core::provider::Provider;

pub use openai_compat::{Endpoint, OpenAiCompatProvider};

/// Whether a model only serves the legacy `/completions` endpoint.
pub fn is_text_completion_model(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model);
    name.starts_with("text-") || name.starts_with("code-") || name.ends_with("-instruct")
}

/// Build the configured backend.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let is_local = config.base_url.contains("localhost") || config.base_url.contains("127.0.0.1");
    let api_key = match (&config.api_key, is_local) {
        (Some(key), _) => key.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(
                "no API key (set AGENTLOOP_API_KEY or OPENAI_API_KEY)".into(),
            ));
        }
    };

    let name = if is_local { "local" } else { "openai" };
    let endpoint = if is_text_completion_model(&config.model) {
        Endpoint::Completions
    } else {
        Endpoint::Chat
    };

    tracing::debug!(provider = name, model = %config.model, ?endpoint, "Building provider");

    Ok(Arc::new(
        OpenAiCompatProvider::new(name, &config.base_url, api_key).with_endpoint(endpoint),
    ))
}
