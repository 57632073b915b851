//! The agent execution loop.
//!
//! An executor repeatedly prompts a text-completion backend, lets a policy
//! interpret the completion, and acts on it:
//!
//! 1. **Prompt** the backend with the task, optional context and the scratchpad
//! 2. **Parse** the completion into an action, a final answer, or nothing usable
//! 3. **Act**: invoke the named tool and record the observation, or return
//! 4. **Repeat** until an answer arrives or a budget runs out
//!
//! Policies ([`policies`]) own every string convention; the executor never
//! looks at raw text itself.

pub mod executor;
pub mod policies;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::{AgentExecutor, RunResult, RunStatus, StopReason};
pub use policies::{
    AgentPolicy, ParseResult, SelfAskWithSearchPolicy, ZeroShotReactPolicy, policy_for,
};
pub use trajectory::{Step, Trajectory};
