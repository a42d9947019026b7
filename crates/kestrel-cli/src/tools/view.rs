//! File and directory viewing tool

use async_trait::async_trait;
use kestrel_agent::{Tool, ToolOutput, parse_input};
use serde::Deserialize;
use serde_json::json;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use super::resolve_path;

const MAX_LINE_LENGTH: usize = 2000;

#[derive(Deserialize)]
struct ViewInput {
    path: String,
    start_line: Option<i64>,
    end_line: Option<i64>,
}

/// Tool for reading files with line numbers and listing directories
pub struct ViewTool;

impl ViewTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ViewTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ViewTool {
    fn name(&self) -> &str {
        "view"
    }

    fn description(&self) -> &str {
        "View a file with line numbers, or list the entries of a directory. For files, start_line and end_line (1-based, inclusive) select a range; end_line of -1 means the end of the file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file or directory (relative or absolute)"
                },
                "start_line": {
                    "type": "integer",
                    "description": "First line to show (1-based, default 1)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "Last line to show, inclusive (-1 or omitted for end of file)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput {
        let input: ViewInput = match parse_input(input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let path = resolve_path(&input.path);

        if cancel.is_cancelled() {
            return ToolOutput::error("Operation cancelled");
        }

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolOutput::error(format!("Path not found: {}", input.path));
            }
            Err(e) => return ToolOutput::error(format!("Failed to access {}: {}", input.path, e)),
        };

        if metadata.is_dir() {
            return list_directory(&path).await;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(format!("Failed to read file: {}", e)),
        };

        match number_lines(&content, input.start_line, input.end_line) {
            Ok(listing) => ToolOutput::text(listing),
            Err(message) => ToolOutput::error(message),
        }
    }
}

/// Render lines `start..=end` (1-based) as a numbered listing
fn number_lines(content: &str, start_line: Option<i64>, end_line: Option<i64>) -> Result<String, String> {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();

    if total == 0 && start_line.is_none() {
        return Ok("(empty file)".to_string());
    }

    let start = start_line.unwrap_or(1);
    if start < 1 {
        return Err(format!("start_line must be at least 1, got {}", start));
    }
    let start = start as usize;
    if start > total {
        return Err(format!(
            "start_line {} is beyond the end of the file ({} lines)",
            start, total
        ));
    }

    let end = match end_line {
        None | Some(-1) => total,
        Some(end) if end < start as i64 => {
            return Err(format!(
                "end_line {} is before start_line {}",
                end, start
            ));
        }
        Some(end) => (end as usize).min(total),
    };

    let listing: Vec<String> = lines[start - 1..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let line: String = if line.chars().count() > MAX_LINE_LENGTH {
                line.chars().take(MAX_LINE_LENGTH).collect()
            } else {
                line.to_string()
            };
            format!("{:>6}\t{}", start + offset, line)
        })
        .collect();

    Ok(listing.join("\n"))
}

async fn list_directory(path: &std::path::Path) -> ToolOutput {
    let mut read_dir = match fs::read_dir(path).await {
        Ok(d) => d,
        Err(e) => return ToolOutput::error(format!("Error reading directory: {}", e)),
    };

    let mut names = Vec::new();
    loop {
        match read_dir.next_entry().await {
            Ok(Some(entry)) => {
                let mut name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                    name.push('/');
                }
                names.push(name);
            }
            Ok(None) => break,
            Err(e) => return ToolOutput::error(format!("Error reading directory: {}", e)),
        }
    }

    if names.is_empty() {
        return ToolOutput::text("(empty directory)");
    }

    names.sort();
    ToolOutput::text(names.join("\n"))
}
