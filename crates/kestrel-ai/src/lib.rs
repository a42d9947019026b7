//! kestrel-ai: conversation wire types and the streaming model client
//!
//! This crate defines the message/content-block model shared by the agent
//! runtime and the CLI, the streaming event protocol, the Anthropic Messages
//! provider, and the built-in model pricing registry.

pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use stream::{MessageEvent, MessageEventStream};
pub use types::*;
