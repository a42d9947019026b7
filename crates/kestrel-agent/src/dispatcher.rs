//! Tool dispatcher: validates model-requested invocations and routes them to
//! the registered executor.

use kestrel_ai::{ToolDefinition, ToolInvocation};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    tool::{BoxedTool, ToolResult, to_definition},
};

/// Name-to-executor table with a compiled schema validator per tool
#[derive(Default)]
pub struct ToolDispatcher {
    tools: Vec<BoxedTool>,
    validators: HashMap<String, jsonschema::Validator>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its parameter schema. A tool with the same
    /// name replaces the earlier registration.
    pub fn register(&mut self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        let validator =
            jsonschema::validator_for(&tool.parameters_schema()).map_err(|e| Error::InvalidToolSchema {
                tool: name.clone(),
                message: e.to_string(),
            })?;

        match self.tools.iter().position(|t| t.name() == name) {
            Some(pos) => {
                tracing::warn!("Tool '{}' registered twice, replacing the earlier one", name);
                self.tools[pos] = tool;
            }
            None => self.tools.push(tool),
        }
        self.validators.insert(name, validator);
        Ok(())
    }

    /// Registered tool names, in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool definitions to advertise to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| to_definition(t.as_ref())).collect()
    }

    /// Validate and execute one invocation.
    ///
    /// An unknown tool or input that fails schema validation is an error.
    /// Failures inside the tool come back as a `ToolResult` with `is_error`.
    pub async fn dispatch(&self, invocation: &ToolInvocation, cancel: CancellationToken) -> Result<ToolResult> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == invocation.name)
            .ok_or_else(|| Error::UnknownTool(invocation.name.clone()))?;

        if let Some(validator) = self.validators.get(&invocation.name) {
            if let Some(message) = validate_with_validator(&invocation.input, validator) {
                return Err(Error::InvalidToolInput {
                    tool: invocation.name.clone(),
                    message,
                });
            }
        }

        tracing::debug!("Dispatching tool {} ({})", invocation.name, invocation.id);
        let output = tool.execute(invocation.input.clone(), cancel).await;
        if output.is_error {
            tracing::debug!("Tool {} reported an error: {}", invocation.name, output.content);
        }

        Ok(ToolResult::new(&invocation.id, output))
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(args: &serde_json::Value, validator: &jsonschema::Validator) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}
