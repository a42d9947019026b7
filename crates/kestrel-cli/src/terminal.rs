//! Terminal I/O: the cancellable stdin line reader and the event renderer

use async_trait::async_trait;
use crossterm::style::Stylize;
use kestrel_agent::{AgentEvent, LineReader, ReadOutcome};
use std::io::{self, BufRead, Write};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::utils::truncate_chars;

/// Forward stdin lines into a channel from a dedicated thread. The channel
/// closes at end of input.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Line reader over forwarded stdin lines. Prompts are printed by the
/// renderer so they land after the previous turn's output.
pub struct StdinReader {
    lines: mpsc::Receiver<String>,
    prompts: mpsc::UnboundedSender<String>,
    after_cancel: bool,
}

impl StdinReader {
    pub fn new(lines: mpsc::Receiver<String>, prompts: mpsc::UnboundedSender<String>) -> Self {
        Self {
            lines,
            prompts,
            after_cancel: false,
        }
    }
}

#[async_trait]
impl LineReader for StdinReader {
    async fn read_line(
        &mut self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> kestrel_agent::Result<ReadOutcome> {
        let prompt = if std::mem::take(&mut self.after_cancel) {
            format!("\n{}", prompt)
        } else {
            prompt.to_string()
        };
        let _ = self.prompts.send(prompt);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.after_cancel = true;
                Ok(ReadOutcome::Cancelled)
            }
            line = self.lines.recv() => Ok(match line {
                Some(line) => ReadOutcome::Line(line),
                None => ReadOutcome::Eof,
            }),
        }
    }
}

/// Renders agent events and prompts to stdout in order
pub struct Renderer {
    handle: JoinHandle<()>,
}

impl Renderer {
    /// Spawn the render task. Returns the renderer and the prompt sender
    /// for [`StdinReader`].
    pub fn spawn(events: broadcast::Receiver<AgentEvent>) -> (Self, mpsc::UnboundedSender<String>) {
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(render_loop(events, prompt_rx, io::stdout()));
        (Self { handle }, prompt_tx)
    }

    /// Wait for the task to render everything queued. Returns once the agent
    /// and the reader have both been dropped.
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!("renderer task failed: {}", e);
        }
    }
}

async fn render_loop<W: Write>(
    mut events: broadcast::Receiver<AgentEvent>,
    mut prompts: mpsc::UnboundedReceiver<String>,
    mut out: W,
) {
    let mut printer = EventPrinter::default();
    let mut events_open = true;
    let mut prompts_open = true;

    while events_open || prompts_open {
        tokio::select! {
            biased;
            event = events.recv(), if events_open => match event {
                Ok(event) => {
                    let _ = printer.print(&mut out, &event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("renderer skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => events_open = false,
            },
            prompt = prompts.recv(), if prompts_open => match prompt {
                Some(prompt) => {
                    // Everything the last step sent is already queued
                    while let Ok(event) = events.try_recv() {
                        let _ = printer.print(&mut out, &event);
                    }
                    let _ = printer.prompt(&mut out, &prompt);
                }
                None => prompts_open = false,
            },
        }
    }
    let _ = out.flush();
}

/// Formats agent events as terminal output
#[derive(Default)]
struct EventPrinter {
    mid_line: bool,
}

impl EventPrinter {
    fn end_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.mid_line {
            writeln!(out)?;
            self.mid_line = false;
        }
        Ok(())
    }

    fn prompt(&mut self, out: &mut impl Write, prompt: &str) -> io::Result<()> {
        self.end_line(out)?;
        write!(out, "{}", prompt)?;
        out.flush()
    }

    fn print(&mut self, out: &mut impl Write, event: &AgentEvent) -> io::Result<()> {
        match event {
            AgentEvent::TextDelta { delta } => {
                write!(out, "{}", delta)?;
                self.mid_line = !delta.ends_with('\n');
            }
            AgentEvent::MessageEnd { .. } => {
                self.end_line(out)?;
            }
            AgentEvent::ToolExecutionStart {
                tool_name, input, ..
            } => {
                self.end_line(out)?;
                let args = truncate_chars(&tool_input_preview(input), 80);
                writeln!(out, "{} {}", format!("[{}]", tool_name).cyan(), args.dark_grey())?;
            }
            AgentEvent::ToolExecutionEnd {
                result, is_error, ..
            } => {
                if *is_error {
                    let preview = truncate_chars(&result.replace('\n', " "), 80);
                    writeln!(out, "  {}", format!("error: {}", preview).red())?;
                } else {
                    let first_line = result.lines().next().unwrap_or("");
                    let more = result.lines().nth(1).is_some();
                    let mut preview = truncate_chars(first_line, 60);
                    if more && !preview.ends_with("...") {
                        preview.push_str("...");
                    }
                    writeln!(out, "  {}", preview.dark_grey())?;
                }
            }
            AgentEvent::TurnEnd { cost } => {
                self.end_line(out)?;
                if let Some(cost) = cost {
                    writeln!(out, "{}", cost.to_string().dark_grey())?;
                }
            }
            AgentEvent::Aborted => {
                self.end_line(out)?;
                writeln!(out, "{}", "Aborted".yellow())?;
            }
            // Fatal errors are reported by main
            AgentEvent::TurnStart { .. } | AgentEvent::Error { .. } => {}
        }
        out.flush()
    }
}

/// One-line summary of a tool's input: the command for shell calls, the
/// path for file tools, compact JSON otherwise
fn tool_input_preview(input: &serde_json::Value) -> String {
    for key in ["command", "path"] {
        if let Some(value) = input.get(key).and_then(|v| v.as_str()) {
            return value.to_string();
        }
    }
    input.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_agent::CostSummary;
    use serde_json::json;

    fn render(events: &[AgentEvent]) -> String {
        let mut out = Vec::new();
        let mut printer = EventPrinter::default();
        for event in events {
            printer.print(&mut out, event).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_and_cost() {
        let output = render(&[
            AgentEvent::TurnStart { input: "hi".into() },
            AgentEvent::TextDelta { delta: "Hel".into() },
            AgentEvent::TextDelta { delta: "lo".into() },
            AgentEvent::TurnEnd {
                cost: Some(CostSummary::default()),
            },
        ]);
        assert!(output.starts_with("Hello\n"));
        assert!(output.contains("Cost: $0.0000"));
    }

    #[test]
    fn test_tool_activity() {
        let output = render(&[
            AgentEvent::ToolExecutionStart {
                tool_use_id: "t1".into(),
                tool_name: "shell_execute".into(),
                input: json!({"command": "ls"}),
            },
            AgentEvent::ToolExecutionEnd {
                tool_use_id: "t1".into(),
                tool_name: "shell_execute".into(),
                result: "first\nsecond".into(),
                is_error: false,
            },
            AgentEvent::ToolExecutionEnd {
                tool_use_id: "t2".into(),
                tool_name: "view".into(),
                result: "Path not found: x".into(),
                is_error: true,
            },
        ]);
        assert!(output.contains("[shell_execute]"));
        assert!(output.contains("ls"));
        assert!(output.contains("first..."));
        assert!(!output.contains("second"));
        assert!(output.contains("error: Path not found: x"));
    }

    #[test]
    fn test_aborted_starts_on_new_line() {
        let output = render(&[
            AgentEvent::TextDelta { delta: "partial".into() },
            AgentEvent::Aborted,
        ]);
        assert!(output.starts_with("partial\n"));
        assert!(output.contains("Aborted"));
    }

    #[test]
    fn test_tool_input_preview() {
        assert_eq!(tool_input_preview(&json!({"command": "ls -la"})), "ls -la");
        assert_eq!(tool_input_preview(&json!({"path": "a.txt", "content": "x"})), "a.txt");
        assert_eq!(tool_input_preview(&json!({"n": 1})), "{\"n\":1}");
    }

    #[tokio::test]
    async fn test_reader_line_cancel_and_eof() {
        let (line_tx, line_rx) = mpsc::channel(4);
        let (prompt_tx, mut prompt_rx) = mpsc::unbounded_channel();
        let mut reader = StdinReader::new(line_rx, prompt_tx);

        line_tx.send("hello".to_string()).await.unwrap();
        let outcome = reader.read_line("> ", CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Line("hello".into()));
        assert_eq!(prompt_rx.recv().await.unwrap(), "> ");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = reader.read_line("> ", cancel).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Cancelled);
        prompt_rx.recv().await.unwrap();

        drop(line_tx);
        let outcome = reader.read_line("Exit? ", CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Eof);
        assert_eq!(prompt_rx.recv().await.unwrap(), "\nExit? ");
    }

    #[tokio::test]
    async fn test_render_loop_flushes_events_before_prompt() {
        let (event_tx, event_rx) = broadcast::channel(16);
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();

        event_tx
            .send(AgentEvent::TextDelta { delta: "answer".into() })
            .unwrap();
        event_tx.send(AgentEvent::TurnEnd { cost: None }).unwrap();
        prompt_tx.send("> ".to_string()).unwrap();
        drop(event_tx);
        drop(prompt_tx);

        let mut out = Vec::new();
        render_loop(event_rx, prompt_rx, &mut out).await;
        assert_eq!(String::from_utf8(out).unwrap(), "answer\n> ");
    }
}
