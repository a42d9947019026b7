//! Shell command execution tool

use async_trait::async_trait;
use kestrel_agent::{Tool, ToolOutput, parse_input};
use serde::Deserialize;
use serde_json::json;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Maximum output size in bytes before truncation
const MAX_OUTPUT_SIZE: usize = 100_000; // 100KB
/// Maximum number of lines before truncation
const MAX_OUTPUT_LINES: usize = 1000;

#[derive(Deserialize)]
struct ShellInput {
    command: String,
}

/// Tool for executing shell commands
pub struct ShellTool;

impl ShellTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell_execute"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the current working directory. Returns a JSON object with stdout and stderr. A non-zero exit status is reported as an error."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: serde_json::Value, cancel: CancellationToken) -> ToolOutput {
        let input: ShellInput = match parse_input(input) {
            Ok(input) => input,
            Err(output) => return output,
        };

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut child = match Command::new(shell)
            .arg(shell_arg)
            .arg(&input.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(format!("Failed to spawn command: {}", e)),
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return ToolOutput::error("Failed to capture command output");
        };

        let run = async {
            let (stdout, stderr) = tokio::join!(capture(stdout), capture(stderr));
            let status = child.wait().await;
            (stdout, stderr, status)
        };

        let finished = tokio::select! {
            _ = cancel.cancelled() => None,
            result = run => Some(result),
        };

        let Some((stdout, stderr, status)) = finished else {
            let _ = child.kill().await;
            tracing::debug!("Killed cancelled command: {}", input.command);
            return ToolOutput::error("Command cancelled");
        };

        let output = json!({
            "stdout": stdout.finish("stdout"),
            "stderr": stderr.finish("stderr"),
        })
        .to_string();

        match status {
            Ok(status) if status.success() => ToolOutput::text(output),
            Ok(status) => match status.code() {
                Some(code) => ToolOutput::error(format!("Command exited with code {}\n{}", code, output)),
                None => ToolOutput::error(format!("Command terminated by a signal\n{}", output)),
            },
            Err(e) => ToolOutput::error(format!("Failed to wait for command: {}", e)),
        }
    }
}

/// One captured output stream, truncated at the line and byte limits
#[derive(Debug, Default)]
struct Captured {
    text: String,
    lines: usize,
    truncated: bool,
    read_error: Option<String>,
}

impl Captured {
    fn push(&mut self, line: &str) {
        if self.truncated {
            return;
        }
        if self.lines >= MAX_OUTPUT_LINES || self.text.len() + line.len() > MAX_OUTPUT_SIZE {
            self.truncated = true;
            return;
        }
        if self.lines > 0 {
            self.text.push('\n');
        }
        self.text.push_str(line);
        self.lines += 1;
    }

    fn finish(mut self, stream: &str) -> String {
        if self.truncated {
            self.text.push_str(&format!(
                "\n\n... ({} truncated at {} lines / {}KB)",
                stream,
                self.lines,
                MAX_OUTPUT_SIZE / 1000
            ));
        }
        if let Some(e) = self.read_error {
            self.text.push_str(&format!("\n\n... ({} read error: {})", stream, e));
        }
        self.text
    }
}

async fn capture<R: AsyncRead + Unpin>(reader: R) -> Captured {
    let mut lines = BufReader::new(reader).lines();
    let mut captured = Captured::default();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => captured.push(&line),
            Ok(None) => break,
            Err(e) => {
                captured.read_error = Some(e.to_string());
                break;
            }
        }
    }
    captured
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    async fn run(command: &str) -> ToolOutput {
        ShellTool::new()
            .execute(json!({ "command": command }), CancellationToken::new())
            .await
    }

    fn parse(output: &str) -> serde_json::Value {
        let json_start = output.find('{').unwrap();
        serde_json::from_str(&output[json_start..]).unwrap()
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let out = run("echo hello; echo oops >&2").await;
        assert!(!out.is_error, "{}", out.content);
        let value = parse(&out.content);
        assert_eq!(value["stdout"], "hello");
        assert_eq!(value["stderr"], "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let out = run("echo partial; exit 3").await;
        assert!(out.is_error);
        assert!(out.content.starts_with("Command exited with code 3"), "{}", out.content);
        assert_eq!(parse(&out.content)["stdout"], "partial");
    }

    #[tokio::test]
    async fn test_output_truncated_at_line_limit() {
        let out = run("seq 1 1500").await;
        let stdout = parse(&out.content)["stdout"].as_str().unwrap().to_string();
        assert!(stdout.starts_with("1\n2\n"));
        assert!(stdout.contains("stdout truncated at 1000 lines"));
        assert!(!stdout.contains("\n1001\n"));
    }

    #[tokio::test]
    async fn test_cancel_kills_command() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let out = ShellTool::new()
            .execute(json!({"command": "sleep 30"}), cancel)
            .await;
        assert!(out.is_error);
        assert_eq!(out.content, "Command cancelled");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
