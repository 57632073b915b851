//! Run events — decoupled observation of the execution loop.
//!
//! The executor publishes an event at every state transition. Subscribers
//! (a CLI progress printer, tests) react without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything the execution loop reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A run began
    RunStarted {
        run_id: String,
        policy: String,
        input: String,
        timestamp: DateTime<Utc>,
    },

    /// The backend returned a completion
    CompletionReceived {
        run_id: String,
        iteration: u32,
        model: String,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was invoked
    ToolInvoked {
        run_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Unparseable output triggered a fix-up nudge
    FixupAttempted {
        run_id: String,
        raw_text: String,
        timestamp: DateTime<Utc>,
    },

    /// A budget ran out and early stopping was applied
    RunStopped {
        run_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The model produced a final answer
    RunFinished {
        run_id: String,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// The run ended with an error
    RunFailed {
        run_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl AgentEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::CompletionReceived { run_id, .. }
            | Self::ToolInvoked { run_id, .. }
            | Self::FixupAttempted { run_id, .. }
            | Self::RunStopped { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
        }
    }
}

/// A broadcast-based event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Runs on
/// different tasks may share one bus; events carry the run id.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
