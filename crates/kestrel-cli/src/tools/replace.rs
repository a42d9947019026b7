//! Exact-text replacement tool

use async_trait::async_trait;
use kestrel_agent::{Tool, ToolOutput, parse_input};
use serde::Deserialize;
use serde_json::json;
use similar::TextDiff;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use super::resolve_path;

/// Diff lines shown before the rest is elided
const MAX_DIFF_LINES: usize = 50;

#[derive(Deserialize)]
struct ReplaceInput {
    path: String,
    old_text: String,
    new_text: String,
}

/// Tool for editing files by replacing one exact occurrence
pub struct ReplaceTextTool;

impl ReplaceTextTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReplaceTextTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReplaceTextTool {
    fn name(&self) -> &str {
        "replace_text"
    }

    fn description(&self) -> &str {
        "Replace exact text in a file. old_text must occur exactly once (including whitespace and newlines); otherwise nothing is changed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit (relative or absolute)"
                },
                "old_text": {
                    "type": "string",
                    "description": "Exact text to find (must occur exactly once)"
                },
                "new_text": {
                    "type": "string",
                    "description": "Text to put in its place"
                }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput {
        let input: ReplaceInput = match parse_input(input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let path = resolve_path(&input.path);

        if cancel.is_cancelled() {
            return ToolOutput::error("Operation cancelled");
        }

        if input.old_text.is_empty() {
            return ToolOutput::error("old_text must not be empty");
        }

        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(format!("Failed to read file: {}", e)),
        };

        let new_content = match replace_once(&content, &input.old_text, &input.new_text) {
            Ok(new_content) => new_content,
            Err(message) => return ToolOutput::error(format!("{} in {}", message, input.path)),
        };

        if cancel.is_cancelled() {
            return ToolOutput::error("Operation cancelled");
        }

        if let Err(e) = fs::write(&path, &new_content).await {
            return ToolOutput::error(format!("Failed to write file: {}", e));
        }

        let diff = generate_diff(&input.path, &content, &new_content);
        if diff.is_empty() {
            ToolOutput::text(format!("Replaced text in {} (no changes)", input.path))
        } else {
            ToolOutput::text(format!("Replaced text in {}\n\n{}", input.path, diff))
        }
    }
}

/// Substitute the single occurrence of `old` in `content`. Overlapping
/// occurrences count separately.
fn replace_once(content: &str, old: &str, new: &str) -> Result<String, String> {
    let Some(first) = content.find(old) else {
        return Err("old_text not found".to_string());
    };
    if content.rfind(old) != Some(first) {
        return Err(format!(
            "old_text matched {} times; include more surrounding context to make it unique",
            count_occurrences(content, old)
        ));
    }

    let mut replaced = String::with_capacity(content.len() - old.len() + new.len());
    replaced.push_str(&content[..first]);
    replaced.push_str(new);
    replaced.push_str(&content[first + old.len()..]);
    Ok(replaced)
}

/// Count occurrences of `needle`, including overlapping ones
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    let mut count = 0;
    let mut from = 0;
    while let Some(at) = haystack[from..].find(needle) {
        count += 1;
        let hit = from + at;
        from = hit + haystack[hit..].chars().next().map_or(1, char::len_utf8);
        if from > haystack.len() {
            break;
        }
    }
    count
}

/// Generate a unified diff string
fn generate_diff(path: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let rendered = diff
        .unified_diff()
        .context_radius(2)
        .header(path, path)
        .to_string();

    let lines: Vec<&str> = rendered.lines().collect();
    if lines.len() > MAX_DIFF_LINES {
        let mut output = lines[..MAX_DIFF_LINES].join("\n");
        output.push_str("\n... (diff truncated)");
        output
    } else {
        rendered.trim_end().to_string()
    }
}
