//! Core types for LLM interactions

use serde::{Deserialize, Serialize};

/// Cost information for a model (per million tokens)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostInfo {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

/// Model definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "claude-sonnet-4-5-20250929")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Cost per million tokens
    pub cost: CostInfo,
    /// Context window size in tokens
    pub context_window: u32,
    /// Maximum output tokens
    pub max_tokens: u32,
}

/// Token usage reported for one model call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u32>,
}

impl Usage {
    /// Usage without any cache activity
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_creation_tokens: None,
            cache_read_tokens: None,
        }
    }

    /// Calculate cost for this usage given a pricing table
    pub fn calculate_cost(&self, cost: &CostInfo) -> CostBreakdown {
        let per_token = |tokens: u32, price: f64| (tokens as f64 / 1_000_000.0) * price;

        let input = per_token(self.input_tokens, cost.input);
        let output = per_token(self.output_tokens, cost.output);
        let cache_write = per_token(self.cache_creation_tokens.unwrap_or(0), cost.cache_write);
        let cache_read = per_token(self.cache_read_tokens.unwrap_or(0), cost.cache_read);

        CostBreakdown {
            input,
            output,
            cache_write,
            cache_read,
            total: input + output + cache_write + cache_read,
        }
    }
}

/// Cost breakdown in dollars
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
    pub total: f64,
}

impl std::ops::AddAssign for CostBreakdown {
    fn add_assign(&mut self, other: Self) {
        self.input += other.input;
        self.output += other.output;
        self.cache_write += other.cache_write;
        self.cache_read += other.cache_read;
        self.total += other.total;
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    EndTurn,
    /// Tool use requested
    ToolUse,
    /// Maximum tokens reached
    MaxTokens,
    /// A stop sequence matched
    StopSequence,
}

impl StopReason {
    /// Map the provider's stop reason string. Unknown reasons end the turn.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }
}

/// Prompt-cache breakpoint attached to a content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheControl {
    Ephemeral,
}

/// Content blocks in array-content messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    /// Tool invocation requested by the model
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Output of a tool invocation, sent back in a user message
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

impl ContentBlock {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: None,
        }
    }

    /// Create a tool use block
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Create a tool result block
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
            cache_control: None,
        }
    }

    /// Return this block with a cache marker set (no-op for tool use blocks)
    pub fn cached(mut self) -> Self {
        self.set_cache_marker();
        self
    }

    pub fn set_cache_marker(&mut self) {
        match self {
            Self::Text { cache_control, .. } | Self::ToolResult { cache_control, .. } => {
                *cache_control = Some(CacheControl::Ephemeral);
            }
            Self::ToolUse { .. } => {}
        }
    }

    pub fn clear_cache_marker(&mut self) {
        match self {
            Self::Text { cache_control, .. } | Self::ToolResult { cache_control, .. } => {
                *cache_control = None;
            }
            Self::ToolUse { .. } => {}
        }
    }

    pub fn has_cache_marker(&self) -> bool {
        matches!(
            self,
            Self::Text { cache_control: Some(_), .. } | Self::ToolResult { cache_control: Some(_), .. }
        )
    }

    /// Get text if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A tool invocation extracted from an assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content: plain text or an ordered list of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Create a plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message with content blocks
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Create an assistant message with content blocks
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Get the content blocks (empty for plain-text content)
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }

    /// Whether any block carries a cache marker
    pub fn has_cache_marker(&self) -> bool {
        self.blocks().iter().any(ContentBlock::has_cache_marker)
    }

    /// Remove cache markers from every block
    pub fn clear_cache_markers(&mut self) {
        if let MessageContent::Blocks(blocks) = &mut self.content {
            blocks.iter_mut().for_each(ContentBlock::clear_cache_marker);
        }
    }

    /// Extract all tool invocations, in appearance order
    pub fn tool_invocations(&self) -> Vec<ToolInvocation> {
        self.blocks()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Get combined text content
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Tool definition for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (used in API calls)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the input object
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Context for an LLM request
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// System prompt
    pub system_prompt: Option<String>,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Available tools
    pub tools: Vec<ToolDefinition>,
}

/// Options for streaming requests
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 1.0)
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_marker_serializes_as_cache_control() {
        let block = ContentBlock::text("hi").cached();
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "text", "text": "hi", "cache_control": {"type": "ephemeral"}})
        );

        let plain = ContentBlock::tool_result("toolu_1", "ok", false);
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok", "is_error": false})
        );
    }

    #[test]
    fn test_message_content_untagged() {
        let plain = Message::user("hello");
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"role": "user", "content": "hello"})
        );

        let parsed: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": [{"type": "tool_use", "id": "t1", "name": "view", "input": {"path": "."}}]
        }))
        .unwrap();
        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(parsed.tool_invocations().len(), 1);
    }

    #[test]
    fn test_tool_use_blocks_never_carry_marker() {
        let block = ContentBlock::tool_use("t1", "view", json!({})).cached();
        assert!(!block.has_cache_marker());
    }

    #[test]
    fn test_clear_cache_markers() {
        let mut msg = Message::user_blocks(vec![
            ContentBlock::text("a").cached(),
            ContentBlock::tool_result("t1", "out", true).cached(),
        ]);
        assert!(msg.has_cache_marker());
        msg.clear_cache_markers();
        assert!(!msg.has_cache_marker());
    }

    #[test]
    fn test_tool_invocations_in_order() {
        let msg = Message::assistant(vec![
            ContentBlock::text("working"),
            ContentBlock::tool_use("a", "view", json!({"path": "."})),
            ContentBlock::tool_use("b", "shell_execute", json!({"command": "ls"})),
        ]);
        let ids: Vec<String> = msg.tool_invocations().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(msg.text(), "working");
    }

    #[test]
    fn test_stop_reason_from_wire() {
        assert_eq!(StopReason::from_wire("tool_use"), StopReason::ToolUse);
        assert_eq!(StopReason::from_wire("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_wire("max_tokens"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_wire("pause_turn"), StopReason::EndTurn);
    }

    #[test]
    fn test_calculate_cost() {
        let cost = CostInfo {
            input: 3.0,
            output: 15.0,
            cache_write: 3.75,
            cache_read: 0.3,
        };
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 100_000,
            cache_creation_tokens: Some(200_000),
            cache_read_tokens: None,
        };
        let breakdown = usage.calculate_cost(&cost);
        assert!((breakdown.input - 3.0).abs() < 1e-9);
        assert!((breakdown.output - 1.5).abs() < 1e-9);
        assert!((breakdown.cache_write - 0.75).abs() < 1e-9);
        assert_eq!(breakdown.cache_read, 0.0);
        assert!((breakdown.total - 5.25).abs() < 1e-9);
    }
}
