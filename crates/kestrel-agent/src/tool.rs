//! Tool trait and results

use async_trait::async_trait;
use kestrel_ai::{ContentBlock, ToolDefinition};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a tool hands back after running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text returned to the model
    pub content: String,
    /// Whether the execution failed
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// A tool output tied to the invocation that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn new(tool_use_id: impl Into<String>, output: ToolOutput) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: output.content,
            is_error: output.is_error,
        }
    }
}

impl From<ToolResult> for ContentBlock {
    fn from(result: ToolResult) -> Self {
        ContentBlock::tool_result(result.tool_use_id, result.content, result.is_error)
    }
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the LLM
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. `input` has already been validated against
    /// [`parameters_schema`](Tool::parameters_schema).
    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn Tool>;

/// Describe a tool for the model
pub fn to_definition(tool: &dyn Tool) -> ToolDefinition {
    ToolDefinition::new(tool.name(), tool.description(), tool.parameters_schema())
}

/// Deserialize validated input into a tool's typed parameters.
///
/// Schema validation happens before execution, so a failure here means the
/// schema and the struct disagree; it is reported as an error result.
pub fn parse_input<T: DeserializeOwned>(input: serde_json::Value) -> Result<T, ToolOutput> {
    serde_json::from_value(input).map_err(|e| ToolOutput::error(format!("Invalid arguments: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool that echoes its arguments.
    struct EchoTool;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, input: serde_json::Value, _cancel: CancellationToken) -> ToolOutput {
            match parse_input::<EchoInput>(input) {
                Ok(input) => ToolOutput::text(input.text),
                Err(output) => output,
            }
        }
    }

    #[tokio::test]
    async fn test_execute_typed_input() {
        let out = EchoTool
            .execute(json!({"text": "hello"}), CancellationToken::new())
            .await;
        assert_eq!(out, ToolOutput::text("hello"));
    }

    #[tokio::test]
    async fn test_parse_input_mismatch_is_error_output() {
        let out = EchoTool.execute(json!({"text": 3}), CancellationToken::new()).await;
        assert!(out.is_error);
        assert!(out.content.starts_with("Invalid arguments"));
    }

    #[test]
    fn test_tool_result_into_block() {
        let block: ContentBlock = ToolResult::new("toolu_1", ToolOutput::error("bad")).into();
        assert_eq!(block, ContentBlock::tool_result("toolu_1", "bad", true));
    }

    #[test]
    fn test_to_definition() {
        let def = to_definition(&EchoTool);
        assert_eq!(def.name, "echo");
        assert_eq!(def.description, "Echoes input");
        assert_eq!(def.input_schema["required"][0], "text");
    }
}
