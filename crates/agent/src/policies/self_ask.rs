//! Self-ask with search.
//!
//! The model decomposes a question into follow-up questions, each answered
//! by one search tool registered as "Intermediate Answer":
//!
//! ```text
//! Question: Who lived longer, Muhammad Ali or Alan Turing?
//! Are follow up questions needed here: Yes.
//! Follow up: How old was Muhammad Ali when he died?
//! Intermediate answer: Muhammad Ali was 74 years old when he died.
//! ...
//! So the final answer is: Muhammad Ali
//! ```
//!
//! Only the last non-empty line of a completion decides what happens next.

use agentloop_core::error::{Error, Result};
use agentloop_core::tool::ToolRegistry;

use super::{AgentPolicy, ParseResult, last_line};

pub const FOLLOW_UP: &str = "Follow up:";
pub const FINAL_ANSWER: &str = "So the final answer is:";
pub const TOOL_NAME: &str = "Intermediate Answer";

const OBSERVATION_PREFIX: &str = "Intermediate answer: ";
const STARTER: &str = "Are follow up questions needed here:";

const EXEMPLARS: &str = "Question: Who lived longer, Muhammad Ali or Alan Turing?
Are follow up questions needed here: Yes.
Follow up: How old was Muhammad Ali when he died?
Intermediate answer: Muhammad Ali was 74 years old when he died.
Follow up: How old was Alan Turing when he died?
Intermediate answer: Alan Turing was 41 years old when he died.
So the final answer is: Muhammad Ali

Question: When was the founder of craigslist born?
Are follow up questions needed here: Yes.
Follow up: Who was the founder of craigslist?
Intermediate answer: Craigslist was founded by Craig Newmark.
Follow up: When was Craig Newmark born?
Intermediate answer: Craig Newmark was born on December 6, 1952.
So the final answer is: December 6, 1952

Question: Who was the maternal grandfather of George Washington?
Are follow up questions needed here: Yes.
Follow up: Who was the mother of George Washington?
Intermediate answer: The mother of George Washington was Mary Ball Washington.
Follow up: Who was the father of Mary Ball Washington?
Intermediate answer: The father of Mary Ball Washington was Joseph Ball.
So the final answer is: Joseph Ball

Question: Are both the directors of Jaws and Casino Royale from the same country?
Are follow up questions needed here: Yes.
Follow up: Who is the director of Jaws?
Intermediate answer: The director of Jaws is Steven Spielberg.
Follow up: Where is Steven Spielberg from?
Intermediate answer: The United States.
Follow up: Who is the director of Casino Royale?
Intermediate answer: The director of Casino Royale is Martin Campbell.
Follow up: Where is Martin Campbell from?
Intermediate answer: New Zealand.
So the final answer is: No

";

/// The self-ask-with-search policy. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfAskWithSearchPolicy;

impl SelfAskWithSearchPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl AgentPolicy for SelfAskWithSearchPolicy {
    fn agent_type(&self) -> &str {
        "self-ask-with-search"
    }

    fn validate_tools(&self, tools: &ToolRegistry) -> Result<()> {
        let names = tools.names();
        if names.len() != 1 {
            return Err(Error::config(format!(
                "self-ask-with-search requires exactly one tool, got {}",
                names.len()
            )));
        }
        if names[0] != TOOL_NAME {
            return Err(Error::config(format!(
                "self-ask-with-search requires a tool named \"{TOOL_NAME}\", got \"{}\"",
                names[0]
            )));
        }
        Ok(())
    }

    fn parse(&self, text: &str) -> ParseResult {
        let invalid = || ParseResult::Invalid {
            raw_text: text.to_string(),
        };
        let Some(line) = last_line(text) else {
            return invalid();
        };

        if let Some(idx) = line.find(FINAL_ANSWER) {
            let output = line[idx + FINAL_ANSWER.len()..].trim();
            if output.is_empty() {
                return invalid();
            }
            return ParseResult::Finish {
                output: output.to_string(),
            };
        }

        if !line.contains(FOLLOW_UP) {
            return invalid();
        }
        match line.rsplit_once(':') {
            Some((_, question)) if !question.trim().is_empty() => ParseResult::Action {
                name: TOOL_NAME.to_string(),
                input: question.trim().to_string(),
            },
            _ => invalid(),
        }
    }

    fn fix_text(&self, text: &str) -> String {
        format!("{text}\n{FINAL_ANSWER}")
    }

    fn observation_prefix(&self) -> &str {
        OBSERVATION_PREFIX
    }

    fn llm_prefix(&self) -> &str {
        ""
    }

    fn starter_string(&self) -> &str {
        STARTER
    }

    fn prompt_header(&self, _tools: &ToolRegistry) -> String {
        EXEMPLARS.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_tools::DynamicTool;
    use std::sync::Arc;

    fn tool(name: &str) -> Arc<dyn agentloop_core::tool::Tool> {
        Arc::new(DynamicTool::new(name, "test tool", |i| async move { Ok(i) }))
    }

    fn action(input: &str) -> ParseResult {
        ParseResult::Action {
            name: TOOL_NAME.into(),
            input: input.into(),
        }
    }

    #[test]
    fn parses_follow_up() {
        let policy = SelfAskWithSearchPolicy::new();
        assert_eq!(
            policy.parse(" Yes.\nFollow up: How old was Muhammad Ali when he died?"),
            action("How old was Muhammad Ali when he died?")
        );
    }

    #[test]
    fn action_input_is_after_last_colon() {
        let policy = SelfAskWithSearchPolicy::new();
        assert_eq!(
            policy.parse("Follow up: What happened at 10:30"),
            action("30")
        );
    }

    #[test]
    fn parses_final_answer() {
        let policy = SelfAskWithSearchPolicy::new();
        assert_eq!(
            policy.parse("Intermediate answer: 41.\nSo the final answer is:   Muhammad Ali  \n\n"),
            ParseResult::Finish {
                output: "Muhammad Ali".into()
            }
        );
    }

    #[test]
    fn final_answer_wins_over_follow_up_on_same_line() {
        let policy = SelfAskWithSearchPolicy::new();
        assert_eq!(
            policy.parse("Follow up: none. So the final answer is: B"),
            ParseResult::Finish { output: "B".into() }
        );
    }

    #[test]
    fn only_last_line_dispatches() {
        let policy = SelfAskWithSearchPolicy::new();
        let text = "Follow up: How old is A?\nI am not sure what to do.";
        assert_eq!(
            policy.parse(text),
            ParseResult::Invalid {
                raw_text: text.into()
            }
        );
    }

    #[test]
    fn empty_and_markerless_are_invalid() {
        let policy = SelfAskWithSearchPolicy::new();
        assert!(policy.parse("").is_invalid());
        assert!(policy.parse("\n  \n").is_invalid());
        assert!(policy.parse("Yes.").is_invalid());
        assert!(policy.parse("Follow up:   ").is_invalid());
    }

    #[test]
    fn bare_final_answer_marker_is_invalid() {
        let policy = SelfAskWithSearchPolicy::new();
        assert!(policy.parse("So the final answer is:").is_invalid());
        assert!(policy.parse("I am not sure
So the final answer is:   
").is_invalid());
    }

    #[test]
    fn parse_is_idempotent() {
        let policy = SelfAskWithSearchPolicy::new();
        for text in ["Follow up: How old is A?", "So the final answer is: A", "hmm", ""] {
            assert_eq!(policy.parse(text), policy.parse(text));
        }
    }

    #[test]
    fn fix_text_leads_to_finish() {
        let policy = SelfAskWithSearchPolicy::new();
        let fixed = policy.fix_text("Intermediate answer: 25");
        assert_eq!(fixed, "Intermediate answer: 25\nSo the final answer is:");
        assert_eq!(
            policy.parse(&format!("{fixed} A")),
            ParseResult::Finish { output: "A".into() }
        );
    }

    #[test]
    fn validate_requires_exactly_intermediate_answer() {
        let policy = SelfAskWithSearchPolicy::new();

        let empty = ToolRegistry::new();
        assert!(matches!(policy.validate_tools(&empty), Err(Error::Config { .. })));

        let two = ToolRegistry::from_tools([tool(TOOL_NAME), tool("search")]).unwrap();
        assert!(matches!(policy.validate_tools(&two), Err(Error::Config { .. })));

        let misnamed = ToolRegistry::from_tools([tool("search")]).unwrap();
        let err = policy.validate_tools(&misnamed).unwrap_err();
        assert!(err.to_string().contains("Intermediate Answer"));

        let good = ToolRegistry::from_tools([tool(TOOL_NAME)]).unwrap();
        assert!(policy.validate_tools(&good).is_ok());
    }

    #[test]
    fn prompt_layout() {
        let policy = SelfAskWithSearchPolicy::new();
        let tools = ToolRegistry::new();
        let prompt = policy.build_prompt("Who is older, A or B?", "", "", &tools);
        assert!(prompt.starts_with("Question: Who lived longer"));
        assert!(prompt.ends_with("Question: Who is older, A or B?\nAre follow up questions needed here:"));
    }
}
