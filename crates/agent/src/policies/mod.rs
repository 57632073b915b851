//! Agent policies — the parsing and prompt conventions of an agent variant.
//!
//! A policy is pure: it turns raw completions into a [`ParseResult`] and
//! knows the strings that frame a prompt. It never calls the backend or a
//! tool. The executor is written once against [`AgentPolicy`]; variants are
//! chosen at construction.
//!
//! 1. **Self-ask with search** — "Follow up:" questions answered by a single
//!    "Intermediate Answer" tool
//! 2. **Zero-shot ReAct** — "Action:" / "Action Input:" against any number
//!    of registered tools

pub mod react;
pub mod self_ask;

use std::sync::Arc;

use agentloop_config::PolicyKind;
use agentloop_core::error::Result;
use agentloop_core::tool::ToolRegistry;
use serde::{Deserialize, Serialize};

pub use react::ZeroShotReactPolicy;
pub use self_ask::SelfAskWithSearchPolicy;

/// What one model completion asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseResult {
    /// Invoke `name` with `input`.
    Action { name: String, input: String },
    /// Return `output` as the answer.
    Finish { output: String },
    /// Neither marker was found.
    Invalid { raw_text: String },
}

impl ParseResult {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// The capability set every agent variant provides.
pub trait AgentPolicy: Send + Sync {
    /// Short identifier, e.g. "self-ask-with-search".
    fn agent_type(&self) -> &str;

    /// Reject tool sets this policy cannot drive. Runs before any run starts.
    fn validate_tools(&self, tools: &ToolRegistry) -> Result<()>;

    /// Interpret a raw completion. Must be deterministic.
    fn parse(&self, text: &str) -> ParseResult;

    /// Nudge appended to an unparseable completion to coax out an answer.
    fn fix_text(&self, text: &str) -> String;

    /// Prepended to every observation in the scratchpad.
    fn observation_prefix(&self) -> &str;

    /// Appended after every observation, before the next completion.
    fn llm_prefix(&self) -> &str;

    /// Inserted once after the question, before the first completion.
    fn starter_string(&self) -> &str;

    /// Everything before the question: instructions, exemplars, tool list.
    fn prompt_header(&self, tools: &ToolRegistry) -> String;

    /// Stop generation before the model writes its own observation.
    fn stop_sequences(&self) -> Vec<String> {
        vec![format!("\n{}", self.observation_prefix().trim_end())]
    }

    /// Directive appended to the scratchpad when asking for a forced conclusion.
    fn finish_prompt(&self) -> &str {
        "\n\nI now need to return a final answer based on the previous steps:"
    }

    fn build_prompt(
        &self,
        input: &str,
        context: &str,
        scratchpad: &str,
        tools: &ToolRegistry,
    ) -> String {
        format!(
            "{}{}Question: {}\n{}{}",
            self.prompt_header(tools),
            context,
            input,
            self.starter_string(),
            scratchpad
        )
    }
}

/// The text after the last non-empty line, trimmed; `None` for blank text.
pub(crate) fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

/// Instantiate the policy selected in configuration.
pub fn policy_for(kind: PolicyKind) -> Arc<dyn AgentPolicy> {
    match kind {
        PolicyKind::SelfAskWithSearch => Arc::new(SelfAskWithSearchPolicy::new()),
        PolicyKind::ZeroShotReact => Arc::new(ZeroShotReactPolicy::new()),
    }
}
