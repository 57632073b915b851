//! Memory collaborators for agentloop.
//!
//! Nothing here is owned by the execution loop: these types implement the
//! `ContextProvider` and `EntityStore` seams from `agentloop-core`.

pub mod entity;
pub mod in_memory;

pub use entity::EntityMemory;
pub use in_memory::InMemoryEntityStore;
