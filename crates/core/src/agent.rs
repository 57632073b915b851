//! Run configuration for the execution loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{Error, Result};

/// Per-run limits and recovery policy.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum loop iterations (model calls that may lead to a tool call).
    /// Must be at least 1.
    pub max_iterations: u32,

    /// Wall-clock budget, checked at iteration boundaries only.
    pub max_execution_time: Option<Duration>,

    /// What to return when a budget is exhausted.
    pub early_stopping: EarlyStopping,

    /// How many fix-up nudges a run may spend on unparseable output.
    pub max_fixups: u32,

    /// What a failing tool invocation does to the run.
    pub tool_errors: ToolErrorPolicy,

    /// Tools whose failures are always fatal, regardless of `tool_errors`.
    pub fatal_tools: Vec<String>,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_execution_time: None,
            early_stopping: EarlyStopping::default(),
            max_fixups: 1,
            tool_errors: ToolErrorPolicy::default(),
            fatal_tools: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Set the iteration limit.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the wall-clock budget.
    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution_time = Some(limit);
        self
    }

    /// Set the early-stopping policy.
    pub fn with_early_stopping(mut self, policy: EarlyStopping) -> Self {
        self.early_stopping = policy;
        self
    }

    /// Set how many fix-up attempts a run may make.
    pub fn with_max_fixups(mut self, n: u32) -> Self {
        self.max_fixups = n;
        self
    }

    /// Set the tool error policy.
    pub fn with_tool_errors(mut self, policy: ToolErrorPolicy) -> Self {
        self.tool_errors = policy;
        self
    }

    /// Mark a tool's failures as fatal.
    pub fn with_fatal_tool(mut self, name: impl Into<String>) -> Self {
        self.fatal_tools.push(name.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(Error::config("max_iterations must be at least 1"));
        }
        if self.max_execution_time.is_some_and(|d| d.is_zero()) {
            return Err(Error::config("max_execution_time must be greater than zero"));
        }
        Ok(())
    }

    /// Whether a failure of `tool` aborts the run.
    pub fn is_fatal(&self, tool: &str) -> bool {
        self.tool_errors == ToolErrorPolicy::Fatal || self.fatal_tools.iter().any(|t| t == tool)
    }
}

/// Behaviour when the iteration or time budget runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStopping {
    /// Return a fixed "stopped" message.
    #[default]
    Force,
    /// Ask the backend once more to conclude from the trajectory so far.
    Generate,
}

/// What happens when a tool invocation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorPolicy {
    /// Record `Error: <message>` as the observation and keep going.
    #[default]
    Observe,
    /// Abort the run.
    Fatal,
}
