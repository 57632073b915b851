//! Trajectory — the ordered action/observation history of one run.
//!
//! Steps are appended once per completed iteration and never edited. The
//! trajectory is rendered back into the prompt as the scratchpad, so its
//! order is both the execution history and the text the model sees.

use serde::{Deserialize, Serialize};

use crate::policies::AgentPolicy;

/// One completed action and its observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// The tool that was invoked.
    pub action: String,
    /// The input passed to the tool.
    pub action_input: String,
    /// The raw completion that produced the action.
    pub log: String,
    /// What the tool returned, or `Error: <message>`.
    pub observation: String,
}

/// Append-only list of [`Step`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    steps: Vec<Step>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the scratchpad text spliced into the next prompt.
    pub fn render(&self, policy: &dyn AgentPolicy) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&step.log);
            out.push('\n');
            out.push_str(policy.observation_prefix());
            out.push_str(&step.observation);
            out.push('\n');
            out.push_str(policy.llm_prefix());
        }
        out
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
