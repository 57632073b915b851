//! Zero-shot ReAct — Thought → Action → Observation over many tools.
//!
//! The tool is named explicitly on an `Action:` line; the loop looks the
//! name up in the registry, so a name the registry lacks is a lookup failure
//! rather than a parse failure.

use agentloop_core::error::{Error, Result};
use agentloop_core::tool::ToolRegistry;

use super::{AgentPolicy, ParseResult};

pub const ACTION: &str = "Action:";
pub const FINAL_ANSWER: &str = "Final Answer:";

const OBSERVATION_PREFIX: &str = "Observation: ";
const LLM_PREFIX: &str = "Thought:";

const PREFIX: &str = "Answer the following questions as best you can. You have access to the following tools:";

#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroShotReactPolicy;

impl ZeroShotReactPolicy {
    pub fn new() -> Self {
        Self
    }
}

/// Locate an `Action Input:` line (any spacing between the words) after the
/// first line of `rest`. Returns (start of that line, start of the input).
fn find_action_input(rest: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for (i, line) in rest.split_inclusive('\n').enumerate() {
        if i > 0
            && let Some(after) = line.strip_prefix("Action")
            && let Some(input) = after.trim_start().strip_prefix("Input:")
        {
            return Some((offset, offset + line.len() - input.len()));
        }
        offset += line.len();
    }
    None
}

/// Remove one pair of surrounding double quotes.
fn strip_quotes(input: &str) -> &str {
    input
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(input)
}

impl AgentPolicy for ZeroShotReactPolicy {
    fn agent_type(&self) -> &str {
        "zero-shot-react"
    }

    fn validate_tools(&self, tools: &ToolRegistry) -> Result<()> {
        if tools.is_empty() {
            return Err(Error::config(
                "zero-shot-react requires at least one tool",
            ));
        }
        Ok(())
    }

    fn parse(&self, text: &str) -> ParseResult {
        let invalid = || ParseResult::Invalid {
            raw_text: text.to_string(),
        };
        if let Some((_, answer)) = text.rsplit_once(FINAL_ANSWER) {
            let output = answer.trim();
            if output.is_empty() {
                return invalid();
            }
            return ParseResult::Finish {
                output: output.to_string(),
            };
        }

        let Some(start) = text.find(ACTION) else {
            return invalid();
        };
        let rest = &text[start + ACTION.len()..];

        let (name_part, input) = match find_action_input(rest) {
            Some((name_end, input_start)) => (&rest[..name_end], rest[input_start..].trim()),
            None => (rest, ""),
        };
        let Some(name) = name_part.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return invalid();
        };

        ParseResult::Action {
            name: name.to_string(),
            input: strip_quotes(input).to_string(),
        }
    }

    fn fix_text(&self, text: &str) -> String {
        format!("{text}\n{FINAL_ANSWER}")
    }

    fn observation_prefix(&self) -> &str {
        OBSERVATION_PREFIX
    }

    fn llm_prefix(&self) -> &str {
        LLM_PREFIX
    }

    fn starter_string(&self) -> &str {
        LLM_PREFIX
    }

    fn prompt_header(&self, tools: &ToolRegistry) -> String {
        format!(
            "{PREFIX}\n\n{}\n\nUse the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\n\
             Begin!\n\n",
            tools.describe(),
            tools.names().join(", ")
        )
    }
}
