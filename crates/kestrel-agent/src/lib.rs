//! kestrel-agent: turn orchestration for the kestrel agent
//!
//! This crate owns the conversation store, the tool dispatcher, the
//! cancellation controller and the [`Agent`] that drives one operator turn
//! through the model and any tool round trips.

pub mod agent;
pub mod cancellation;
pub mod conversation;
pub mod cost;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod input;
pub mod tool;
pub mod transport;

pub use agent::{Agent, AgentConfig, CONFIRM_EXIT_PROMPT, INPUT_PROMPT};
pub use cancellation::{CancellationController, Interrupt, ScopedToken};
pub use conversation::{Conversation, ConversationState};
pub use cost::CostSummary;
pub use dispatcher::ToolDispatcher;
pub use error::{Error, Result};
pub use events::AgentEvent;
pub use input::{LineReader, ReadOutcome, is_affirmative};
pub use tool::{BoxedTool, Tool, ToolOutput, ToolResult, parse_input};
pub use transport::{ProviderTransport, Transport};
