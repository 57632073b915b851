//! Built-in tool implementations for agentloop.
//!
//! Tools give the agent a way to reach outside the model: search the web,
//! read and write files in a workspace, or run any async closure.

pub mod dynamic;
pub mod file_store;
pub mod fs;
pub mod serpapi;

use std::sync::Arc;

use agentloop_config::{PolicyKind, ToolsConfig};
use agentloop_core::error::ToolError;
use agentloop_core::tool::{Tool, ToolRegistry};

pub use dynamic::DynamicTool;
pub use file_store::{FileStore, InMemoryFileStore, LocalFileStore};
pub use fs::{ReadFileTool, WriteFileTool};
pub use serpapi::SerpApiTool;

/// The tool name the self-ask policy requires.
pub const INTERMEDIATE_ANSWER: &str = "Intermediate Answer";

/// Names accepted in `tools.enabled`.
pub const BUILTIN_TOOLS: &[&str] = &["search", "read_file", "write_file"];

/// Build the registry a policy expects from configuration.
///
/// Self-ask gets exactly one search tool named "Intermediate Answer".
/// The zero-shot policy gets every tool listed in `tools.enabled`.
pub fn registry_for(policy: PolicyKind, config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    match policy {
        PolicyKind::SelfAskWithSearch => {
            let search = SerpApiTool::new(config.serpapi_api_key.clone()).with_name(INTERMEDIATE_ANSWER);
            ToolRegistry::from_tools([Arc::new(search) as Arc<dyn Tool>])
        }
        PolicyKind::ZeroShotReact => {
            let store: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.workspace_dir));
            let mut registry = ToolRegistry::new();
            for name in &config.enabled {
                let tool: Arc<dyn Tool> = match name.as_str() {
                    "search" => Arc::new(SerpApiTool::new(config.serpapi_api_key.clone())),
                    "read_file" => Arc::new(ReadFileTool::new(store.clone())),
                    "write_file" => Arc::new(WriteFileTool::new(store.clone())),
                    other => return Err(ToolError::NotFound(other.to_string())),
                };
                registry.register(tool)?;
            }
            Ok(registry)
        }
    }
}
