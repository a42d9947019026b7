//! Line insertion tool

use async_trait::async_trait;
use kestrel_agent::{Tool, ToolOutput, parse_input};
use serde::Deserialize;
use serde_json::json;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use super::{resolve_path, split_lines};

#[derive(Deserialize)]
struct InsertInput {
    path: String,
    after_line: i64,
    content: String,
}

/// Tool for inserting lines into an existing file
pub struct InsertLinesTool;

impl InsertLinesTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InsertLinesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for InsertLinesTool {
    fn name(&self) -> &str {
        "insert_lines"
    }

    fn description(&self) -> &str {
        "Insert lines into a file after the given line number. after_line 0 inserts at the top; after_line equal to the line count appends."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit (relative or absolute)"
                },
                "after_line": {
                    "type": "integer",
                    "description": "Line number after which to insert (0 = beginning of file)"
                },
                "content": {
                    "type": "string",
                    "description": "Lines to insert"
                }
            },
            "required": ["path", "after_line", "content"]
        })
    }

    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput {
        let input: InsertInput = match parse_input(input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let path = resolve_path(&input.path);

        if cancel.is_cancelled() {
            return ToolOutput::error("Operation cancelled");
        }

        let original = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(format!("Failed to read file: {}", e)),
        };

        let updated = match insert_after(&original, input.after_line, &input.content) {
            Ok(updated) => updated,
            Err(message) => return ToolOutput::error(message),
        };

        if let Err(e) = fs::write(&path, &updated).await {
            return ToolOutput::error(format!("Failed to write file: {}", e));
        }

        ToolOutput::text(format!(
            "Inserted {} line(s) after line {} of {}",
            input.content.lines().count(),
            input.after_line,
            input.path
        ))
    }
}

/// Insert `content` after 1-based line `after_line`, keeping the file's line
/// ending style and trailing newline
fn insert_after(original: &str, after_line: i64, content: &str) -> Result<String, String> {
    let (mut lines, trailing_newline) = split_lines(original);
    let line_count = lines.len();

    if after_line < 0 || after_line as usize > line_count {
        return Err(format!(
            "after_line {} is out of range (file has {} lines)",
            after_line, line_count
        ));
    }

    let tail = lines.split_off(after_line as usize);
    lines.extend(content.lines());
    lines.extend(tail);

    let newline = if original.contains("\r\n") { "\r\n" } else { "\n" };
    let mut updated = lines.join(newline);
    if trailing_newline || (original.is_empty() && content.ends_with('\n')) {
        updated.push_str(newline);
    }
    Ok(updated)
}
