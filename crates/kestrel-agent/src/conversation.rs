//! Conversation store: message history, usage records and run-control flags.
//!
//! The store is owned by the [`Agent`](crate::Agent) and only mutated through
//! the transitions below, so the active turn is its single writer.

use kestrel_ai::{Message, Usage};

/// Snapshot of everything the store tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    /// `false` once the operator has chosen to leave; never flips back
    pub running: bool,
    /// Set only while the exit confirmation is pending
    pub interrupted: bool,
    /// Ordered message history
    pub messages: Vec<Message>,
    /// One record per completed model call
    pub usage_log: Vec<Usage>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            running: true,
            interrupted: false,
            messages: Vec::new(),
            usage_log: Vec::new(),
        }
    }
}

/// The conversation store.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    state: ConversationState,
}

impl Conversation {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only snapshot
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn running(&self) -> bool {
        self.state.running
    }

    pub fn interrupted(&self) -> bool {
        self.state.interrupted
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn usage_log(&self) -> &[Usage] {
        &self.state.usage_log
    }

    pub fn message_count(&self) -> usize {
        self.state.messages.len()
    }

    /// Append a message. Earlier messages lose their cache markers so the new
    /// message is the only cache breakpoint in the history.
    pub fn append_message(&mut self, message: Message) {
        for prior in &mut self.state.messages {
            prior.clear_cache_markers();
        }
        self.state.messages.push(message);
    }

    /// Record the usage of one completed model call
    pub fn append_usage(&mut self, usage: Usage) {
        self.state.usage_log.push(usage);
    }

    /// Drop every message past `count`. No-op when `count` is not smaller
    /// than the current length.
    pub fn truncate_messages(&mut self, count: usize) {
        if count < self.state.messages.len() {
            tracing::debug!(
                "Rolling back conversation from {} to {} messages",
                self.state.messages.len(),
                count
            );
            self.state.messages.truncate(count);
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.state.running = running;
    }

    pub fn set_interrupted(&mut self, interrupted: bool) {
        self.state.interrupted = interrupted;
    }

    /// Restore the empty baseline
    pub fn reset(&mut self) {
        self.state = ConversationState::default();
    }
}
