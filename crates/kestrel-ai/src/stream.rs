//! Streaming event types

use crate::types::{Message, StopReason, Usage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a model reply streams in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Reply started
    Start,
    /// Text content started
    TextStart { content_index: usize },
    /// Text content delta
    TextDelta { content_index: usize, delta: String },
    /// Text content completed
    TextEnd { content_index: usize, text: String },
    /// Tool use block started
    ToolUseStart {
        content_index: usize,
        id: String,
        name: String,
    },
    /// Tool input delta (partial JSON)
    ToolUseDelta { content_index: usize, delta: String },
    /// Tool use block completed
    ToolUseEnd {
        content_index: usize,
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Reply completed successfully
    Done {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred
    Error { error_type: String, message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;
