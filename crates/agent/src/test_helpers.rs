//! Shared test helpers for executor and policy tests.

use std::sync::{Arc, Mutex};

use agentloop_core::error::{ProviderError, ToolError};
use agentloop_core::provider::{
    CompletionRequest, CompletionResponse, Provider, Usage, truncate_at_stop,
};
use agentloop_core::tool::{Tool, ToolRegistry};
use agentloop_tools::DynamicTool;

/// A mock provider that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next completion in the queue, cut at
/// the request's stop sequences. Once the queue is empty the `fallback`
/// text is returned forever; without one the provider panics.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that always answers with `text`.
    pub fn repeating(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::new(&[])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let next = self.responses.lock().unwrap().pop();
        let text = match (next, &self.fallback) {
            (Some(text), _) => text,
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => panic!(
                "ScriptedProvider: no more responses (call #{})",
                self.call_count() + 1
            ),
        };
        let text = truncate_at_stop(&text, &request.stop);
        self.requests.lock().unwrap().push(request);
        Ok(CompletionResponse {
            text,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// An "Intermediate Answer" tool backed by a fixed question → answer table.
/// Unknown questions fail.
pub fn lookup_tool(answers: &[(&str, &str)]) -> Arc<dyn Tool> {
    let table: Vec<(String, String)> = answers
        .iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect();
    Arc::new(DynamicTool::new(
        "Intermediate Answer",
        "Search for an answer",
        move |input| {
            let found = table.iter().find(|(q, _)| *q == input).map(|(_, a)| a.clone());
            async move {
                found.ok_or_else(|| ToolError::ExecutionFailed {
                    tool_name: "Intermediate Answer".into(),
                    reason: format!("no result for '{input}'"),
                })
            }
        },
    ))
}

pub fn registry(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::from_tools(tools).unwrap())
}
