//! # agentloop core
//!
//! Domain types, traits, and error definitions for the agentloop execution
//! loop. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the loop is a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping backends and tools via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod provider;
pub mod tool;
pub mod memory;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use provider::{CompletionRequest, CompletionResponse, Provider, Usage};
pub use tool::{Tool, ToolRegistry};
pub use memory::{ContextProvider, EntityStore};
pub use agent::{EarlyStopping, RunConfig, ToolErrorPolicy};
pub use event::{AgentEvent, EventBus};
