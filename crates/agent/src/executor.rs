//! The agent executor — prompt, parse, dispatch, repeat.
//!
//! One `run` walks the state machine
//! `Start → Iterating → {Finished | Stopped(max iterations) | Stopped(timeout) | Failed}`:
//!
//! 1. **Check budgets** (iterations, wall-clock) at the iteration boundary
//! 2. **Build the prompt** from the input, optional context and the rendered trajectory
//! 3. **Call the backend** with the policy's stop sequences
//! 4. **Parse** the completion; on `Invalid`, spend a fix-up nudge if any remain
//! 5. **Dispatch**: finish, or invoke the named tool and append a step
//!
//! Everything a run mutates lives in a per-run [`RunState`]; the executor
//! itself is shared read-only, so independent runs may proceed concurrently.

use std::fmt;
use std::sync::Arc;

use agentloop_core::agent::{EarlyStopping, RunConfig};
use agentloop_core::error::{Error, Result};
use agentloop_core::event::{AgentEvent, EventBus};
use agentloop_core::memory::ContextProvider;
use agentloop_core::provider::{CompletionRequest, Provider};
use agentloop_core::tool::ToolRegistry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::policies::{AgentPolicy, ParseResult};
use crate::trajectory::{Step, Trajectory};

/// Why a run ended without a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
    Timeout,
}

impl StopReason {
    /// The output of a force-stopped run.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MaxIterations => "Agent stopped due to max iterations.",
            Self::Timeout => "Agent stopped due to timeout.",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterations => write!(f, "max_iterations"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Finished,
    Stopped { reason: StopReason },
}

/// The outcome of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// The final answer, or the early-stopping output.
    pub output: String,
    pub trajectory: Trajectory,
    pub status: RunStatus,
    /// Loop iterations started.
    pub iterations: u32,
    /// Backend calls made, fix-ups and early-stopping included.
    pub model_calls: u32,
}

impl RunResult {
    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// Loop-local state, created at the start of a run and dropped at its end.
struct RunState<'a> {
    run_id: String,
    input: &'a str,
    context: String,
    trajectory: Trajectory,
    iterations: u32,
    model_calls: u32,
    fixups: u32,
    started: Instant,
}

impl RunState<'_> {
    fn into_result(self, output: String, status: RunStatus) -> RunResult {
        RunResult {
            output,
            trajectory: self.trajectory,
            status,
            iterations: self.iterations,
            model_calls: self.model_calls,
        }
    }
}

/// Drives a policy, a backend and a tool registry through repeated iterations.
pub struct AgentExecutor {
    /// The text-completion backend
    provider: Arc<dyn Provider>,

    /// The model to request
    model: String,

    /// Sampling temperature
    temperature: f32,

    /// Completion length cap
    max_tokens: Option<u32>,

    /// Parsing and prompt conventions
    policy: Arc<dyn AgentPolicy>,

    /// Tools, validated against the policy
    tools: Arc<ToolRegistry>,

    /// Optional extra prompt context (e.g. entity memory)
    context: Option<Arc<dyn ContextProvider>>,

    /// Event bus for run events
    event_bus: Arc<EventBus>,
}

impl AgentExecutor {
    /// Create an executor. Fails if `tools` does not satisfy the policy.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        policy: Arc<dyn AgentPolicy>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self> {
        Self::validate(policy.as_ref(), &tools)?;
        Ok(Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            policy,
            tools,
            context: None,
            event_bus: Arc::new(EventBus::default()),
        })
    }

    /// Check a tool set against a policy's declared requirements.
    pub fn validate(policy: &dyn AgentPolicy, tools: &ToolRegistry) -> Result<()> {
        policy.validate_tools(tools).inspect_err(|e| {
            warn!(policy = policy.agent_type(), error = %e, "Tool validation failed");
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Splice text from `context` into every prompt and report finished exchanges to it.
    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn policy(&self) -> &dyn AgentPolicy {
        self.policy.as_ref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run the loop on `input` until it finishes, stops, or fails.
    pub async fn run(&self, input: &str, config: &RunConfig) -> Result<RunResult> {
        config.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            policy = self.policy.agent_type(),
            model = %self.model,
            max_iterations = config.max_iterations,
            "Run starting"
        );
        self.event_bus.publish(AgentEvent::RunStarted {
            run_id: run_id.clone(),
            policy: self.policy.agent_type().to_string(),
            input: input.to_string(),
            timestamp: Utc::now(),
        });

        let context = self.load_context(input).await;
        let state = RunState {
            run_id: run_id.clone(),
            input,
            context,
            trajectory: Trajectory::new(),
            iterations: 0,
            model_calls: 0,
            fixups: 0,
            started: Instant::now(),
        };

        let result = self.iterate(state, config).await;
        match &result {
            Ok(run) => match run.status {
                RunStatus::Finished => {
                    info!(run_id = %run_id, iterations = run.iterations, "Run finished");
                    self.event_bus.publish(AgentEvent::RunFinished {
                        run_id,
                        iterations: run.iterations,
                        timestamp: Utc::now(),
                    });
                    self.save_context(input, &run.output).await;
                }
                RunStatus::Stopped { reason } => {
                    warn!(run_id = %run_id, %reason, "Run stopped early");
                    self.event_bus.publish(AgentEvent::RunStopped {
                        run_id,
                        reason: reason.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            },
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Run failed");
                self.event_bus.publish(AgentEvent::RunFailed {
                    run_id,
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
        result
    }

    async fn iterate(&self, mut state: RunState<'_>, config: &RunConfig) -> Result<RunResult> {
        loop {
            if state.iterations >= config.max_iterations {
                return self.stop(state, StopReason::MaxIterations, config).await;
            }
            if let Some(limit) = config.max_execution_time
                && state.started.elapsed() >= limit
            {
                return self.stop(state, StopReason::Timeout, config).await;
            }
            state.iterations += 1;
            debug!(run_id = %state.run_id, iteration = state.iterations, "Iteration");

            let scratchpad = state.trajectory.render(self.policy.as_ref());
            let prompt = self.policy.build_prompt(state.input, &state.context, &scratchpad, &self.tools);
            let text = self.complete(&mut state, prompt.clone()).await?;

            let (parsed, log) = match self.policy.parse(&text) {
                ParseResult::Invalid { .. } if state.fixups < config.max_fixups => {
                    state.fixups += 1;
                    let fixed = self.policy.fix_text(&text);
                    debug!(run_id = %state.run_id, "Unparseable output, attempting fix-up");
                    self.event_bus.publish(AgentEvent::FixupAttempted {
                        run_id: state.run_id.clone(),
                        raw_text: text.clone(),
                        timestamp: Utc::now(),
                    });
                    let more = self.complete(&mut state, format!("{prompt}{fixed}")).await?;
                    let combined = format!("{fixed}{more}");
                    (self.policy.parse(&combined), combined)
                }
                parsed => (parsed, text),
            };

            match parsed {
                ParseResult::Finish { output } => {
                    return Ok(state.into_result(output, RunStatus::Finished));
                }
                ParseResult::Invalid { raw_text } => {
                    return Err(Error::Parse { raw_text });
                }
                ParseResult::Action { name, input } => {
                    let tool = self.tools.lookup(&name).ok_or_else(|| Error::UnknownTool {
                        name: name.clone(),
                        available: self.tools.names().iter().map(|n| n.to_string()).collect(),
                    })?;

                    debug!(run_id = %state.run_id, tool = %name, input = %input, "Invoking tool");
                    let started = Instant::now();
                    let outcome = tool.invoke(&input).await;
                    self.event_bus.publish(AgentEvent::ToolInvoked {
                        run_id: state.run_id.clone(),
                        tool_name: name.clone(),
                        success: outcome.is_ok(),
                        duration_ms: started.elapsed().as_millis() as u64,
                        timestamp: Utc::now(),
                    });

                    let observation = match outcome {
                        Ok(observation) => observation,
                        Err(e) if config.is_fatal(&name) => {
                            return Err(Error::ToolFailed { tool: name, source: e });
                        }
                        Err(e) => {
                            warn!(tool = %name, error = %e, "Tool failed, recording as observation");
                            format!("Error: {e}")
                        }
                    };

                    let direct = tool.return_direct();
                    state.trajectory.push(Step {
                        action: name,
                        action_input: input,
                        log,
                        observation: observation.clone(),
                    });
                    if direct {
                        return Ok(state.into_result(observation, RunStatus::Finished));
                    }
                }
            }
        }
    }

    /// Apply the early-stopping policy.
    async fn stop(
        &self,
        mut state: RunState<'_>,
        reason: StopReason,
        config: &RunConfig,
    ) -> Result<RunResult> {
        let status = RunStatus::Stopped { reason };
        let output = match config.early_stopping {
            EarlyStopping::Force => reason.message().to_string(),
            EarlyStopping::Generate => {
                let scratchpad = format!(
                    "{}{}",
                    state.trajectory.render(self.policy.as_ref()),
                    self.policy.finish_prompt()
                );
                let prompt =
                    self.policy
                        .build_prompt(state.input, &state.context, &scratchpad, &self.tools);
                let text = self.complete(&mut state, prompt).await?;
                match self.policy.parse(&text) {
                    ParseResult::Finish { output } => output,
                    _ => text.trim().to_string(),
                }
            }
        };
        Ok(state.into_result(output, status))
    }

    async fn complete(&self, state: &mut RunState<'_>, prompt: String) -> Result<String> {
        let mut request =
            CompletionRequest::new(&self.model, prompt).with_stop(self.policy.stop_sequences());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;
        state.model_calls += 1;

        self.event_bus.publish(AgentEvent::CompletionReceived {
            run_id: state.run_id.clone(),
            iteration: state.iterations,
            model: response.model.clone(),
            tokens_used: response.usage.map(|u| u.total_tokens),
            timestamp: Utc::now(),
        });
        debug!(run_id = %state.run_id, chars = response.text.len(), "Completion received");
        Ok(response.text)
    }

    async fn load_context(&self, input: &str) -> String {
        let Some(context) = &self.context else {
            return String::new();
        };
        match context.load_context(input).await {
            Ok(text) => {
                if !text.is_empty() {
                    debug!(provider = context.name(), chars = text.len(), "Loaded context");
                }
                text
            }
            Err(e) => {
                warn!(provider = context.name(), "Context load failed: {e}");
                String::new()
            }
        }
    }

    async fn save_context(&self, input: &str, output: &str) {
        let Some(context) = &self.context else {
            return;
        };
        if let Err(e) = context.save_context(input, output).await {
            warn!(provider = context.name(), "Context save failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{SelfAskWithSearchPolicy, ZeroShotReactPolicy};
    use crate::test_helpers::{ScriptedProvider, lookup_tool, registry};
    use agentloop_core::error::{MemoryError, ToolError};
    use agentloop_core::tool::Tool;
    use agentloop_tools::DynamicTool;
    use std::sync::Mutex;
    use std::time::Duration;

    fn self_ask(provider: Arc<ScriptedProvider>, tools: Arc<ToolRegistry>) -> AgentExecutor {
        AgentExecutor::new(provider, "mock-model", Arc::new(SelfAskWithSearchPolicy::new()), tools)
            .unwrap()
    }

    fn ages() -> Arc<dyn Tool> {
        lookup_tool(&[("How old is A?", "30"), ("How old is B?", "25")])
    }

    #[tokio::test]
    async fn who_is_older() {
        let provider = Arc::new(ScriptedProvider::new(&[
            " Yes.\nFollow up: How old is A?",
            "Follow up: How old is B?",
            "So the final answer is: A",
        ]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let result = executor
            .run("Who is older, A or B?", &RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "A");
        assert_eq!(result.status, RunStatus::Finished);
        assert_eq!(result.trajectory.len(), 2);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.model_calls, 3);

        let steps = result.trajectory.steps();
        assert_eq!(steps[0].action, "Intermediate Answer");
        assert_eq!(steps[0].action_input, "How old is A?");
        assert_eq!(steps[0].observation, "30");
        assert_eq!(steps[1].action_input, "How old is B?");
        assert_eq!(steps[1].observation, "25");

        let prompts = provider.prompts();
        assert!(prompts[0].ends_with("Question: Who is older, A or B?\nAre follow up questions needed here:"));
        assert!(prompts[1].ends_with(
            "Are follow up questions needed here: Yes.\nFollow up: How old is A?\nIntermediate answer: 30\n"
        ));
        assert!(prompts[2].ends_with("Follow up: How old is B?\nIntermediate answer: 25\n"));
    }

    #[tokio::test]
    async fn requests_carry_stop_sequences_and_settings() {
        let provider = Arc::new(ScriptedProvider::new(&["So the final answer is: A"]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]))
            .with_temperature(0.3)
            .with_max_tokens(64);

        executor.run("q", &RunConfig::default()).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.stop, vec!["\nIntermediate answer:".to_string()]);
        assert_eq!(request.model, "mock-model");
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, Some(64));
    }

    #[tokio::test]
    async fn backend_overrun_is_cut_at_stop_sequence() {
        // The model hallucinates its own observation; the stop sequence removes it.
        let provider = Arc::new(ScriptedProvider::new(&[
            "Follow up: How old is A?\nIntermediate answer: 99",
            "So the final answer is: A",
        ]));
        let executor = self_ask(provider, registry(vec![ages()]));

        let result = executor.run("q", &RunConfig::default()).await.unwrap();
        assert_eq!(result.trajectory.steps()[0].observation, "30");
        assert_eq!(result.trajectory.steps()[0].log, "Follow up: How old is A?");
    }

    #[tokio::test]
    async fn tool_error_becomes_observation() {
        let failing = lookup_tool(&[("How old is B?", "25")]);
        let provider = Arc::new(ScriptedProvider::new(&[
            "Follow up: How old is A?",
            "Follow up: How old is B?",
            "So the final answer is: B",
        ]));
        let executor = self_ask(provider, registry(vec![failing]));

        let result = executor.run("Who is older, A or B?", &RunConfig::default()).await.unwrap();

        let obs = &result.trajectory.steps()[0].observation;
        assert!(obs.starts_with("Error: "), "got {obs}");
        assert!(obs.contains("no result for 'How old is A?'"));
        assert_eq!(result.trajectory.len(), 2);
        assert_eq!(result.output, "B");
    }

    #[tokio::test]
    async fn fatal_tool_error_aborts() {
        let failing = lookup_tool(&[]);
        let provider = Arc::new(ScriptedProvider::new(&["Follow up: How old is A?"]));
        let executor = self_ask(provider, registry(vec![failing]));

        let config = RunConfig::default().with_fatal_tool("Intermediate Answer");
        let err = executor.run("q", &config).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ToolFailed { ref tool, source: ToolError::ExecutionFailed { .. } } if tool == "Intermediate Answer"
        ));
    }

    #[tokio::test]
    async fn unparseable_backend_terminates() {
        for n in [1, 3, 10] {
            let provider = Arc::new(ScriptedProvider::repeating("hmm\nno markers here"));
            let executor = self_ask(provider.clone(), registry(vec![ages()]));

            let config = RunConfig::default().with_max_iterations(n);
            let err = executor.run("q", &config).await.unwrap_err();

            assert!(matches!(err, Error::Parse { .. }));
            assert!(provider.call_count() <= n as usize + 1);
        }
    }

    #[tokio::test]
    async fn parse_failure_without_fixups() {
        let provider = Arc::new(ScriptedProvider::new(&["garbage"]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let config = RunConfig::default().with_max_fixups(0);
        let err = executor.run("q", &config).await.unwrap_err();
        assert!(matches!(err, Error::Parse { ref raw_text } if raw_text == "garbage"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn fixup_recovers_stalled_output() {
        let provider = Arc::new(ScriptedProvider::new(&["I think A is older", " A"]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let result = executor.run("Who is older, A or B?", &RunConfig::default()).await.unwrap();

        assert_eq!(result.output, "A");
        assert_eq!(result.model_calls, 2);
        assert!(result.trajectory.is_empty());
        assert!(provider.prompts()[1].ends_with("I think A is older\nSo the final answer is:"));
    }

    #[tokio::test]
    async fn fixup_budget_is_per_run() {
        // First iteration spends the only fix-up on a follow-up; the second stall fails.
        let provider = Arc::new(ScriptedProvider::new(&[
            "thinking",
            "\nFollow up: How old is A?",
            "still thinking",
        ]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let err = executor.run("q", &RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, Error::Parse { ref raw_text } if raw_text == "still thinking"));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_fixup_completion_is_parse_error() {
        let provider = Arc::new(ScriptedProvider::new(&["I am not sure", ""]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let err = executor.run("q", &RunConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Parse { ref raw_text } if raw_text == "I am not sure\nSo the final answer is:"
        ));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn react_fixup_recovers_stalled_output() {
        let search: Arc<dyn Tool> = Arc::new(DynamicTool::new("search", "Search", |i| async move { Ok(i) }));
        let provider = Arc::new(ScriptedProvider::new(&[" I think I know this already.", " Alan Turing"]));
        let executor = AgentExecutor::new(
            provider.clone(),
            "mock-model",
            Arc::new(ZeroShotReactPolicy::new()),
            registry(vec![search]),
        )
        .unwrap();

        let result = executor.run("Who broke Enigma?", &RunConfig::default()).await.unwrap();

        assert_eq!(result.output, "Alan Turing");
        assert_eq!(result.status, RunStatus::Finished);
        assert_eq!(result.model_calls, 2);
        assert!(result.trajectory.is_empty());
        assert!(provider.prompts()[1].ends_with("Thought: I think I know this already.\nFinal Answer:"));
    }

    #[tokio::test]
    async fn max_iterations_force() {
        let provider = Arc::new(ScriptedProvider::repeating("Follow up: How old is A?"));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let config = RunConfig::default().with_max_iterations(3);
        let result = executor.run("q", &config).await.unwrap();

        assert_eq!(
            result.status,
            RunStatus::Stopped {
                reason: StopReason::MaxIterations
            }
        );
        assert_eq!(result.output, "Agent stopped due to max iterations.");
        assert_eq!(result.trajectory.len(), 3);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn max_iterations_generate() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Follow up: How old is A?",
            "So the final answer is: probably A",
        ]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let config = RunConfig::default()
            .with_max_iterations(1)
            .with_early_stopping(EarlyStopping::Generate);
        let result = executor.run("q", &config).await.unwrap();

        assert_eq!(result.output, "probably A");
        assert!(!result.is_finished());
        assert_eq!(result.model_calls, 2);
        assert!(provider.prompts()[1].ends_with(
            "Intermediate answer: 30\n\n\nI now need to return a final answer based on the previous steps:"
        ));
    }

    #[tokio::test]
    async fn generate_falls_back_to_raw_text() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Follow up: How old is A?",
            "  A seems older.  ",
        ]));
        let executor = self_ask(provider, registry(vec![ages()]));

        let config = RunConfig::default()
            .with_max_iterations(1)
            .with_early_stopping(EarlyStopping::Generate);
        let result = executor.run("q", &config).await.unwrap();
        assert_eq!(result.output, "A seems older.");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_checked_between_iterations() {
        let slow: Arc<dyn Tool> = Arc::new(DynamicTool::new("Intermediate Answer", "slow", |_| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("30".to_string())
        }));
        let provider = Arc::new(ScriptedProvider::repeating("Follow up: How old is A?"));
        let executor = self_ask(provider.clone(), registry(vec![slow]));

        let config = RunConfig::default().with_max_execution_time(Duration::from_secs(5));
        let result = executor.run("q", &config).await.unwrap();

        assert_eq!(
            result.status,
            RunStatus::Stopped {
                reason: StopReason::Timeout
            }
        );
        assert_eq!(result.output, "Agent stopped due to timeout.");
        // The in-flight tool call was not interrupted.
        assert_eq!(result.trajectory.len(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_fatal() {
        let invoked = Arc::new(Mutex::new(0));
        let counter = invoked.clone();
        let search: Arc<dyn Tool> = Arc::new(DynamicTool::new("search", "Search", move |i| {
            *counter.lock().unwrap() += 1;
            async move { Ok(i) }
        }));
        let provider = Arc::new(ScriptedProvider::new(&["Action: calculator\nAction Input: 2+2"]));
        let executor = AgentExecutor::new(
            provider,
            "mock-model",
            Arc::new(ZeroShotReactPolicy::new()),
            registry(vec![search]),
        )
        .unwrap();

        let err = executor.run("2+2?", &RunConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownTool { ref name, ref available } if name == "calculator" && available == &["search"]
        ));
        assert_eq!(*invoked.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn react_multi_tool_run() {
        let search: Arc<dyn Tool> = Arc::new(DynamicTool::new("search", "Search", |_| async {
            Ok("Alan Turing died at 41".to_string())
        }));
        let upper: Arc<dyn Tool> = Arc::new(DynamicTool::new("upper", "Uppercase", |i| async move {
            Ok(i.to_uppercase())
        }));
        let provider = Arc::new(ScriptedProvider::new(&[
            " I should search.\nAction: search\nAction Input: Alan Turing age",
            " Now shout it.\nAction: upper\nAction Input: 41",
            " I now know the final answer\nFinal Answer: 41",
        ]));
        let executor = AgentExecutor::new(
            provider.clone(),
            "mock-model",
            Arc::new(ZeroShotReactPolicy::new()),
            registry(vec![search, upper]),
        )
        .unwrap();

        let result = executor.run("How old was Alan Turing?", &RunConfig::default()).await.unwrap();
        assert_eq!(result.output, "41");
        assert_eq!(result.trajectory.len(), 2);
        assert_eq!(result.trajectory.steps()[1].action, "upper");

        let prompts = provider.prompts();
        assert!(prompts[1].ends_with(
            "Action Input: Alan Turing age\nObservation: Alan Turing died at 41\nThought:"
        ));
        assert_eq!(provider.requests()[0].stop, vec!["\nObservation:".to_string()]);
    }

    #[tokio::test]
    async fn return_direct_short_circuits() {
        let direct: Arc<dyn Tool> = Arc::new(
            DynamicTool::new("lookup", "Direct lookup", |_| async { Ok("42".to_string()) })
                .with_return_direct(true),
        );
        let provider = Arc::new(ScriptedProvider::new(&["Action: lookup\nAction Input: answer"]));
        let executor = AgentExecutor::new(
            provider.clone(),
            "mock-model",
            Arc::new(ZeroShotReactPolicy::new()),
            registry(vec![direct]),
        )
        .unwrap();

        let result = executor.run("q", &RunConfig::default()).await.unwrap();
        assert_eq!(result.output, "42");
        assert!(result.is_finished());
        assert_eq!(result.trajectory.len(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn construction_validates_tools() {
        let policy: Arc<dyn AgentPolicy> = Arc::new(SelfAskWithSearchPolicy::new());
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let other: Arc<dyn Tool> =
            Arc::new(DynamicTool::new("search", "Search", |i| async move { Ok(i) }));

        for tools in [
            registry(vec![]),
            registry(vec![ages(), other.clone()]),
            registry(vec![other.clone()]),
        ] {
            let result = AgentExecutor::new(provider.clone(), "m", policy.clone(), tools);
            assert!(matches!(result, Err(Error::Config { .. })));
        }
        assert!(AgentExecutor::new(provider, "m", policy, registry(vec![ages()])).is_ok());
    }

    #[tokio::test]
    async fn invalid_run_config_rejected() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let executor = self_ask(provider.clone(), registry(vec![ages()]));

        let config = RunConfig::default().with_max_iterations(0);
        assert!(matches!(executor.run("q", &config).await, Err(Error::Config { .. })));
        assert_eq!(provider.call_count(), 0);
    }

    /// Records what the executor hands to a context provider.
    #[derive(Default)]
    struct RecordingContext {
        saved: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl ContextProvider for RecordingContext {
        fn name(&self) -> &str {
            "recording"
        }

        async fn load_context(&self, _input: &str) -> std::result::Result<String, MemoryError> {
            Ok("Context:\nA: born in 1994\n\n".into())
        }

        async fn save_context(&self, input: &str, output: &str) -> std::result::Result<(), MemoryError> {
            self.saved.lock().unwrap().push((input.into(), output.into()));
            Ok(())
        }

        async fn clear(&self) -> std::result::Result<(), MemoryError> {
            self.saved.lock().unwrap().clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn context_is_spliced_and_saved() {
        let memory = Arc::new(RecordingContext::default());
        let provider = Arc::new(ScriptedProvider::new(&["So the final answer is: A"]));
        let executor = self_ask(provider.clone(), registry(vec![ages()])).with_context(memory.clone());

        executor.run("Who is older?", &RunConfig::default()).await.unwrap();

        assert!(provider.prompts()[0].contains("Context:\nA: born in 1994\n\nQuestion: Who is older?"));
        assert_eq!(
            *memory.saved.lock().unwrap(),
            vec![("Who is older?".to_string(), "A".to_string())]
        );
    }

    #[tokio::test]
    async fn stopped_runs_are_not_saved() {
        let memory = Arc::new(RecordingContext::default());
        let provider = Arc::new(ScriptedProvider::repeating("Follow up: How old is A?"));
        let executor = self_ask(provider, registry(vec![ages()])).with_context(memory.clone());

        let config = RunConfig::default().with_max_iterations(1);
        executor.run("q", &config).await.unwrap();
        assert!(memory.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_trace_the_run() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let provider = Arc::new(ScriptedProvider::new(&[
            "I am unsure",
            "\nFollow up: How old is A?",
            "So the final answer is: A",
        ]));
        let executor = self_ask(provider, registry(vec![ages()])).with_event_bus(bus);

        executor.run("q", &RunConfig::default()).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            let json = serde_json::to_value(event.as_ref()).unwrap();
            kinds.push(json["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec![
                "run_started",
                "completion_received",
                "fixup_attempted",
                "completion_received",
                "tool_invoked",
                "completion_received",
                "run_finished",
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_runs_share_executor() {
        let provider = Arc::new(ScriptedProvider::repeating("So the final answer is: A"));
        let executor = Arc::new(self_ask(provider.clone(), registry(vec![ages()])));

        let config = RunConfig::default();
        let (a, b) = tokio::join!(executor.run("first", &config), executor.run("second", &config));
        assert_eq!(a.unwrap().output, "A");
        assert_eq!(b.unwrap().output, "A");
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn run_result_serializes() {
        let result = RunResult {
            output: "A".into(),
            trajectory: Trajectory::new(),
            status: RunStatus::Stopped {
                reason: StopReason::Timeout,
            },
            iterations: 2,
            model_calls: 2,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["state"], "stopped");
        assert_eq!(json["status"]["reason"], "timeout");
    }
}
