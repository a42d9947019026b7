//! Turn orchestration

use futures::StreamExt;
use kestrel_ai::{ContentBlock, CostInfo, Message, MessageEvent, StopReason, Usage};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    cancellation::CancellationController,
    conversation::{Conversation, ConversationState},
    cost::CostSummary,
    dispatcher::ToolDispatcher,
    error::Result,
    events::AgentEvent,
    input::{LineReader, ReadOutcome, is_affirmative},
    tool::BoxedTool,
    transport::Transport,
};

/// Prompt shown while waiting for operator input
pub const INPUT_PROMPT: &str = "> ";

/// Prompt shown after an interrupt at the input prompt
pub const CONFIRM_EXIT_PROMPT: &str = "Exit kestrel? (y/N) ";

/// Agent configuration
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// System prompt
    pub system_prompt: Option<String>,
    /// Per-million-token prices for the active model
    pub pricing: CostInfo,
    /// Attach a cost summary to every completed turn
    pub report_cost: bool,
}

enum TurnOutcome {
    Completed,
    Aborted,
}

struct ModelReply {
    message: Message,
    stop_reason: StopReason,
    usage: Usage,
}

/// The main agent that orchestrates conversations
pub struct Agent {
    config: AgentConfig,
    conversation: Conversation,
    dispatcher: ToolDispatcher,
    transport: Arc<dyn Transport>,
    cancellation: CancellationController,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Agent {
    /// Create a new agent
    pub fn new(config: AgentConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            conversation: Conversation::new(),
            dispatcher: ToolDispatcher::new(),
            transport,
            cancellation: CancellationController::new(),
            event_tx,
        }
    }

    /// Subscribe to agent events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    /// Handle for delivering operator interrupts from another task
    pub fn cancellation(&self) -> CancellationController {
        self.cancellation.clone()
    }

    /// Register a tool
    pub fn add_tool(&mut self, tool: BoxedTool) -> Result<()> {
        self.dispatcher.register(tool)
    }

    /// Get tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.dispatcher.tool_names()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Read-only snapshot of the conversation store
    pub fn state(&self) -> &ConversationState {
        self.conversation.state()
    }

    pub fn is_running(&self) -> bool {
        self.conversation.running()
    }

    pub fn is_interrupted(&self) -> bool {
        self.conversation.interrupted()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn usage_log(&self) -> &[Usage] {
        self.conversation.usage_log()
    }

    /// Cost of every completed model call so far
    pub fn cost_summary(&self) -> CostSummary {
        CostSummary::from_usage(self.conversation.usage_log(), &self.config.pricing)
    }

    /// Wait for one line of operator input and act on it: run a turn, ask
    /// for exit confirmation after an interrupt, or stop at end of input.
    /// Does nothing once the agent has stopped running.
    pub async fn step(&mut self, reader: &mut dyn LineReader) -> Result<()> {
        if !self.conversation.running() {
            return Ok(());
        }

        let outcome = {
            let guard = self.cancellation.begin_input();
            reader.read_line(INPUT_PROMPT, guard.token()).await?
        };

        match outcome {
            ReadOutcome::Line(line) => {
                if line.trim().is_empty() {
                    return Ok(());
                }
                self.run_turn(&line).await
            }
            ReadOutcome::Cancelled => self.confirm_exit(reader).await,
            ReadOutcome::Eof => {
                tracing::debug!("Input closed, stopping");
                self.conversation.set_running(false);
                Ok(())
            }
        }
    }

    async fn confirm_exit(&mut self, reader: &mut dyn LineReader) -> Result<()> {
        self.conversation.set_interrupted(true);
        let answer = {
            let guard = self.cancellation.begin_confirmation();
            reader.read_line(CONFIRM_EXIT_PROMPT, guard.token()).await
        };
        self.conversation.set_interrupted(false);

        match answer? {
            ReadOutcome::Line(line) if is_affirmative(&line) => self.conversation.set_running(false),
            ReadOutcome::Eof => self.conversation.set_running(false),
            ReadOutcome::Line(_) | ReadOutcome::Cancelled => {}
        }
        Ok(())
    }

    /// Run one full turn for `input`, including any tool round trips.
    ///
    /// A cancelled turn rolls the history back to where it started and is
    /// not an error. Model and protocol failures are returned.
    pub async fn run_turn(&mut self, input: &str) -> Result<()> {
        let checkpoint = self.conversation.message_count();
        let _ = self.event_tx.send(AgentEvent::TurnStart {
            input: input.to_string(),
        });

        let guard = self.cancellation.begin_model_call();
        let outbound = Message::user_blocks(vec![ContentBlock::text(input).cached()]);
        let outcome = self.run_tool_loop(outbound, guard.token()).await;
        drop(guard);

        match outcome {
            Ok(TurnOutcome::Completed) => {
                let cost = self.config.report_cost.then(|| self.cost_summary());
                let _ = self.event_tx.send(AgentEvent::TurnEnd { cost });
                Ok(())
            }
            Ok(TurnOutcome::Aborted) => {
                self.conversation.truncate_messages(checkpoint);
                let _ = self.event_tx.send(AgentEvent::Aborted);
                Ok(())
            }
            Err(e) => {
                let _ = self.event_tx.send(AgentEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_tool_loop(&mut self, mut outbound: Message, cancel: CancellationToken) -> Result<TurnOutcome> {
        loop {
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TurnOutcome::Aborted),
                reply = self.call_model(&outbound) => reply?,
            };

            self.conversation.append_message(outbound);
            self.conversation.append_message(reply.message.clone());
            self.conversation.append_usage(reply.usage.clone());

            let invocations = reply.message.tool_invocations();
            let _ = self.event_tx.send(AgentEvent::MessageEnd {
                message: reply.message,
                stop_reason: reply.stop_reason,
                usage: reply.usage,
            });

            if reply.stop_reason != StopReason::ToolUse {
                return Ok(TurnOutcome::Completed);
            }
            if invocations.is_empty() {
                tracing::warn!("Reply stopped for tool use without any tool_use blocks");
                return Ok(TurnOutcome::Completed);
            }

            let mut results: Vec<ContentBlock> = Vec::with_capacity(invocations.len());
            for invocation in &invocations {
                let _ = self.event_tx.send(AgentEvent::ToolExecutionStart {
                    tool_use_id: invocation.id.clone(),
                    tool_name: invocation.name.clone(),
                    input: invocation.input.clone(),
                });

                let result = self.dispatcher.dispatch(invocation, cancel.clone()).await?;

                let _ = self.event_tx.send(AgentEvent::ToolExecutionEnd {
                    tool_use_id: invocation.id.clone(),
                    tool_name: invocation.name.clone(),
                    result: result.content.clone(),
                    is_error: result.is_error,
                });
                results.push(result.into());

                if cancel.is_cancelled() {
                    return Ok(TurnOutcome::Aborted);
                }
            }

            if let Some(last) = results.last_mut() {
                last.set_cache_marker();
            }
            outbound = Message::user_blocks(results);
        }
    }

    /// Send the history plus `outbound` and collect the streamed reply
    async fn call_model(&self, outbound: &Message) -> Result<ModelReply> {
        let mut history = self.conversation.messages().to_vec();
        history.iter_mut().for_each(Message::clear_cache_markers);
        history.push(outbound.clone());

        let tools = self.dispatcher.definitions();
        let mut stream = self
            .transport
            .invoke(&history, &tools, self.config.system_prompt.as_deref())
            .await?;

        while let Some(event) = stream.next().await {
            match event {
                MessageEvent::TextDelta { delta, .. } => {
                    let _ = self.event_tx.send(AgentEvent::TextDelta { delta });
                }
                MessageEvent::Done {
                    message,
                    stop_reason,
                    usage,
                } => {
                    tracing::debug!(
                        "Reply done: {:?}, {} in / {} out tokens",
                        stop_reason,
                        usage.input_tokens,
                        usage.output_tokens
                    );
                    return Ok(ModelReply {
                        message,
                        stop_reason,
                        usage,
                    });
                }
                MessageEvent::Error { error_type, message } => {
                    return Err(kestrel_ai::Error::api(error_type, message).into());
                }
                _ => {}
            }
        }

        Err(kestrel_ai::Error::Stream("model stream ended without a reply".into()).into())
    }
}
