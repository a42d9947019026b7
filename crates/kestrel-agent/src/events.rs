//! Agent event types

use kestrel_ai::{Message, StopReason, Usage};
use serde::{Deserialize, Serialize};

use crate::cost::CostSummary;

/// Events emitted while a turn runs. Subscribers only render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A turn started for this operator input
    TurnStart { input: String },

    /// Streamed reply text
    TextDelta { delta: String },

    /// A model reply completed
    MessageEnd {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },

    /// Tool execution started
    ToolExecutionStart {
        tool_use_id: String,
        tool_name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        tool_use_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
    },

    /// The turn completed; `cost` is absent when cost reporting is off
    TurnEnd { cost: Option<CostSummary> },

    /// The turn was cancelled and rolled back
    Aborted,

    /// A fatal error ended the turn
    Error { message: String },
}

impl AgentEvent {
    /// Check if this event closes a turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::TurnEnd { .. } | AgentEvent::Aborted | AgentEvent::Error { .. }
        )
    }
}
