//! Tool trait — the abstraction over agent capabilities.
//!
//! A tool is a named, described capability with a string-in/string-out
//! contract: search the web, read a file, ask a sub-question. Tools are
//! registered once into a [`ToolRegistry`] which is then frozen behind an
//! `Arc` and shared read-only by every run.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use crate::error::ToolError;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "Intermediate Answer", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (rendered into prompts).
    fn description(&self) -> &str;

    /// Invoke the tool. May perform network or file I/O.
    async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError>;

    /// When true, the observation becomes the run's final output.
    fn return_direct(&self) -> bool {
        false
    }
}

/// An ordered set of uniquely named tools.
///
/// Insertion order is preserved for prompt rendering; lookup is by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tools, rejecting duplicate names.
    pub fn from_tools(
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> std::result::Result<Self, ToolError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool. Names must be unique within the registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Look up and invoke a tool.
    pub async fn invoke(&self, name: &str, input: &str) -> std::result::Result<String, ToolError> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(input).await
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Iterate over the tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render `name: description` lines for prompt construction.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
