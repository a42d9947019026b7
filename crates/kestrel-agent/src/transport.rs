//! Model service abstraction

use async_trait::async_trait;
use kestrel_ai::{
    Context, Message, MessageEventStream, Model, Result, StreamOptions, ToolDefinition,
    providers::LlmProvider,
};
use std::sync::Arc;

/// The model service the agent talks to.
///
/// Implementations return a stream of incremental events that ends with
/// `Done` or `Error`. Dropping the stream must abort the underlying call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
        system_prompt: Option<&str>,
    ) -> Result<MessageEventStream>;
}

/// Direct provider transport - calls the LLM API for a fixed model
pub struct ProviderTransport {
    provider: Arc<dyn LlmProvider>,
    model: Model,
    options: StreamOptions,
}

impl ProviderTransport {
    pub fn new(provider: Arc<dyn LlmProvider>, model: Model) -> Self {
        Self {
            provider,
            model,
            options: StreamOptions::default(),
        }
    }

    /// Override max tokens / temperature
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn invoke(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
        system_prompt: Option<&str>,
    ) -> Result<MessageEventStream> {
        let context = Context {
            system_prompt: system_prompt.map(str::to_string),
            messages: history.to_vec(),
            tools: tools.to_vec(),
        };

        tracing::debug!(
            "Invoking {} with {} messages",
            self.model.id,
            context.messages.len()
        );
        self.provider.stream(&self.model, &context, &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use kestrel_ai::{MessageEvent, StopReason, Usage};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        seen: Mutex<Option<(String, Context, Option<u32>)>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn stream(&self, model: &Model, context: &Context, options: &StreamOptions) -> Result<MessageEventStream> {
            *self.seen.lock() = Some((model.id.clone(), context.clone(), options.max_tokens));
            Ok(Box::pin(futures::stream::iter(vec![MessageEvent::Done {
                message: Message::assistant(vec![]),
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            }])))
        }
    }

    #[tokio::test]
    async fn test_provider_transport_builds_context() {
        let provider = Arc::new(RecordingProvider::default());
        let transport = ProviderTransport::new(provider.clone(), kestrel_ai::models::custom_model("m"))
            .with_options(StreamOptions {
                max_tokens: Some(100),
                temperature: None,
            });

        let history = vec![Message::user("hi")];
        let tools = vec![ToolDefinition::new("view", "View", serde_json::json!({"type": "object"}))];
        let mut stream = transport.invoke(&history, &tools, Some("sys")).await.unwrap();
        assert!(stream.next().await.unwrap().is_terminal());

        let (model_id, context, max_tokens) = provider.seen.lock().take().unwrap();
        assert_eq!(model_id, "m");
        assert_eq!(context.system_prompt.as_deref(), Some("sys"));
        assert_eq!(context.messages, history);
        assert_eq!(context.tools, tools);
        assert_eq!(max_tokens, Some(100));
    }
}
