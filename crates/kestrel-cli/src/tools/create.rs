//! File creation tool

use async_trait::async_trait;
use kestrel_agent::{Tool, ToolOutput, parse_input};
use serde::Deserialize;
use serde_json::json;
use tokio::fs;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::resolve_path;

#[derive(Deserialize)]
struct CreateInput {
    path: String,
    content: String,
}

/// Tool for creating new files
pub struct CreateFileTool;

impl CreateFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CreateFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file with the given content. Fails if the file already exists. Parent directories are created as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to create (relative or absolute)"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput {
        let input: CreateInput = match parse_input(input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let path = resolve_path(&input.path);

        if cancel.is_cancelled() {
            return ToolOutput::error("Operation cancelled");
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                return ToolOutput::error(format!("Failed to create directory: {}", e));
            }
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return ToolOutput::error(format!("File already exists: {}", input.path));
            }
            Err(e) => return ToolOutput::error(format!("Failed to create file: {}", e)),
        };

        if let Err(e) = write_or_remove(&path, &mut file, input.content.as_bytes()).await {
            return ToolOutput::error(format!("Failed to write file: {}", e));
        }

        ToolOutput::text(format!(
            "Created {} ({} bytes)",
            input.path,
            input.content.len()
        ))
    }
}

/// Write `content` to a freshly created file, deleting the file if the write
/// fails so a later attempt does not see it as existing
async fn write_or_remove<W: AsyncWrite + Unpin>(
    path: &Path,
    file: &mut W,
    content: &[u8],
) -> std::io::Result<()> {
    let written = match file.write_all(content).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), "failed to remove partial file: {}", e);
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create(path: &std::path::Path, content: &str) -> ToolOutput {
        CreateFileTool::new()
            .execute(
                json!({"path": path.to_str().unwrap(), "content": content}),
                CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn test_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/new.txt");

        let out = create(&path, "hello\n").await;

        assert!(!out.is_error, "{}", out.content);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_existing_file_is_error_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists.txt");
        std::fs::write(&path, "original").unwrap();

        let out = create(&path, "replacement").await;

        assert!(out.is_error);
        assert!(out.content.contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    /// Accepts nothing
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::other("no space left on device")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        std::fs::write(&path, "").unwrap();

        let result = write_or_remove(&path, &mut FullDisk, b"data").await;

        assert!(result.is_err());
        assert!(!path.exists());

        let out = create(&path, "retry").await;
        assert!(!out.is_error, "{}", out.content);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "retry");
    }
}
