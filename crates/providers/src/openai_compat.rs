//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, llama.cpp server and any
//! endpoint exposing `/v1/chat/completions` or the legacy `/v1/completions`.
//!
//! The agent loop speaks plain text, so chat endpoints receive the whole
//! rendered prompt as a single user message.

use async_trait::async_trait;
use agentloop_core::error::ProviderError;
use agentloop_core::provider::{
    CompletionRequest, CompletionResponse, Provider, Usage, truncate_at_stop,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::tokens;

/// Which endpoint shape to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/chat/completions` with a single user message
    Chat,
    /// Legacy `/completions` with a raw prompt
    Completions,
}

/// An OpenAI-compatible text-generation backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            endpoint: Endpoint::Chat,
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Select the endpoint shape.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn url(&self) -> String {
        match self.endpoint {
            Endpoint::Chat => format!("{}/chat/completions", self.base_url),
            Endpoint::Completions => format!("{}/completions", self.base_url),
        }
    }

    /// Build the JSON body for a request.
    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = match self.endpoint {
            Endpoint::Chat => serde_json::json!({
                "model": request.model,
                "messages": [{ "role": "user", "content": request.prompt }],
                "temperature": request.temperature,
            }),
            Endpoint::Completions => serde_json::json!({
                "model": request.model,
                "prompt": request.prompt,
                "temperature": request.temperature,
            }),
        };

        // Legacy text models have small windows: size the completion to fit.
        let max_tokens = request.max_tokens.or_else(|| match self.endpoint {
            Endpoint::Completions => {
                Some(tokens::calculate_max_tokens(&request.prompt, &request.model) as u32)
            }
            Endpoint::Chat => None,
        });
        if let Some(max_tokens) = max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        body
    }

    /// Extract the generated text from a successful response body.
    fn parse_body(&self, api_response: ApiResponse) -> Result<CompletionResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let text = match self.endpoint {
            Endpoint::Chat => choice.message.and_then(|m| m.content),
            Endpoint::Completions => choice.text,
        }
        .unwrap_or_default();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            text,
            usage,
            model: api_response.model,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let body = self.build_body(&request);

        debug!(provider = %self.name, model = %request.model, stop = ?request.stop, "Sending completion request");

        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        // Some local servers ignore `stop`.
        let mut completion = self.parse_body(api_response)?;
        completion.text = truncate_at_stop(&completion.text, &request.stop);
        Ok(completion)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
