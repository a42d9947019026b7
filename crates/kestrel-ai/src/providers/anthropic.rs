//! Anthropic Messages API provider

use super::LlmProvider;
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{CacheControl, ContentBlock, Context, Message, Model, StopReason, StreamOptions, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| Error::InvalidApiKey)?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert("accept", HeaderValue::from_static("text/event-stream"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream> {
        let request = build_request(model, context, options);
        let url = format!("{}/v1/messages", model.base_url.trim_end_matches('/'));

        tracing::debug!(
            "Anthropic API URL: {} ({} messages, {} tools)",
            url,
            context.messages.len(),
            context.tools.len()
        );

        let request_builder = self.client.post(&url).headers(self.headers()?).json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

fn build_request<'a>(
    model: &'a Model,
    context: &'a Context,
    options: &StreamOptions,
) -> AnthropicRequest<'a> {
    let system = context.system_prompt.as_deref().map(|text| {
        vec![SystemBlock {
            block_type: "text",
            text,
            cache_control: Some(CacheControl::Ephemeral),
        }]
    });

    let tools = context
        .tools
        .iter()
        .map(|tool| {
            let mut input_schema = tool.input_schema.clone();
            match input_schema.as_object_mut() {
                Some(obj) => {
                    obj.entry("type").or_insert(serde_json::json!("object"));
                }
                None => {
                    input_schema = serde_json::json!({ "type": "object", "properties": {} });
                }
            }
            AnthropicTool {
                name: &tool.name,
                description: &tool.description,
                input_schema,
            }
        })
        .collect();

    AnthropicRequest {
        model: &model.id,
        messages: &context.messages,
        max_tokens: options.max_tokens.unwrap_or(model.max_tokens),
        stream: true,
        system,
        temperature: options.temperature,
        tools,
    }
}

/// Create the event stream from SSE events. Dropping the stream closes the
/// underlying connection, which is how an in-flight call gets cancelled.
fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulator = StreamAccumulator::default();

        yield MessageEvent::Start;

        while let Some(event_result) = event_source.next().await {
            match event_result {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    for event in accumulator.handle(&message.event, &message.data) {
                        yield event;
                    }
                    if accumulator.is_finished() {
                        break;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    match serde_json::from_str::<ErrorEvent>(&body) {
                        Ok(data) => accumulator.fail(data.error.error_type, data.error.message),
                        Err(_) => accumulator.fail("http_error", format!("HTTP {}: {}", status, body)),
                    }
                    break;
                }
                Err(e) => {
                    accumulator.fail("sse_error", e.to_string());
                    break;
                }
            }
        }

        event_source.close();
        yield accumulator.finish();
    }
}

// ============================================================================
// Stream accumulation
// ============================================================================

#[derive(Debug, Default)]
enum PartialBlock {
    #[default]
    Empty,
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input_json: String,
    },
}

/// Folds SSE payloads into incremental events and the final reply.
#[derive(Debug, Default)]
struct StreamAccumulator {
    blocks: Vec<PartialBlock>,
    usage: Usage,
    stop_reason: Option<StopReason>,
    error: Option<(String, String)>,
    stopped: bool,
}

impl StreamAccumulator {
    fn is_finished(&self) -> bool {
        self.stopped || self.error.is_some()
    }

    fn fail(&mut self, error_type: impl Into<String>, message: impl Into<String>) {
        self.error = Some((error_type.into(), message.into()));
    }

    fn handle(&mut self, event: &str, data: &str) -> Vec<MessageEvent> {
        let mut events = Vec::new();

        match event {
            "message_start" => {
                if let Some(data) = parse_payload::<MessageStartEvent>(event, data) {
                    self.merge_usage(&data.message.usage);
                }
            }
            "content_block_start" => {
                if let Some(data) = parse_payload::<ContentBlockStartEvent>(event, data) {
                    let index = data.index;
                    while self.blocks.len() <= index {
                        self.blocks.push(PartialBlock::Empty);
                    }

                    match data.content_block.block_type.as_str() {
                        "text" => {
                            self.blocks[index] = PartialBlock::Text {
                                text: data.content_block.text.unwrap_or_default(),
                            };
                            events.push(MessageEvent::TextStart { content_index: index });
                        }
                        "tool_use" => {
                            let id = data.content_block.id.unwrap_or_default();
                            let name = data.content_block.name.unwrap_or_default();
                            self.blocks[index] = PartialBlock::ToolUse {
                                id: id.clone(),
                                name: name.clone(),
                                input_json: String::new(),
                            };
                            events.push(MessageEvent::ToolUseStart {
                                content_index: index,
                                id,
                                name,
                            });
                        }
                        other => tracing::debug!("Ignoring content block of type {}", other),
                    }
                }
            }
            "content_block_delta" => {
                if let Some(data) = parse_payload::<ContentBlockDeltaEvent>(event, data) {
                    let index = data.index;
                    match (self.blocks.get_mut(index), data.delta.delta_type.as_str()) {
                        (Some(PartialBlock::Text { text }), "text_delta") => {
                            let delta = data.delta.text.unwrap_or_default();
                            text.push_str(&delta);
                            events.push(MessageEvent::TextDelta {
                                content_index: index,
                                delta,
                            });
                        }
                        (Some(PartialBlock::ToolUse { input_json, .. }), "input_json_delta") => {
                            let delta = data.delta.partial_json.unwrap_or_default();
                            input_json.push_str(&delta);
                            events.push(MessageEvent::ToolUseDelta {
                                content_index: index,
                                delta,
                            });
                        }
                        _ => {}
                    }
                }
            }
            "content_block_stop" => {
                if let Some(data) = parse_payload::<ContentBlockStopEvent>(event, data) {
                    let index = data.index;
                    match self.blocks.get(index) {
                        Some(PartialBlock::Text { text }) => {
                            events.push(MessageEvent::TextEnd {
                                content_index: index,
                                text: text.clone(),
                            });
                        }
                        Some(PartialBlock::ToolUse {
                            id,
                            name,
                            input_json,
                        }) => {
                            events.push(MessageEvent::ToolUseEnd {
                                content_index: index,
                                id: id.clone(),
                                name: name.clone(),
                                input: parse_tool_input(input_json),
                            });
                        }
                        _ => {}
                    }
                }
            }
            "message_delta" => {
                if let Some(data) = parse_payload::<MessageDeltaEvent>(event, data) {
                    if let Some(reason) = data.delta.stop_reason {
                        self.stop_reason = Some(StopReason::from_wire(&reason));
                    }
                    if let Some(usage) = data.usage {
                        self.merge_usage(&usage);
                    }
                }
            }
            "message_stop" => {
                self.stopped = true;
            }
            "error" => match serde_json::from_str::<ErrorEvent>(data) {
                Ok(data) => self.fail(data.error.error_type, data.error.message),
                Err(_) => self.fail("api_error", data.to_string()),
            },
            _ => {}
        }

        events
    }

    fn merge_usage(&mut self, info: &UsageInfo) {
        if let Some(input) = info.input_tokens {
            self.usage.input_tokens = input;
        }
        if let Some(output) = info.output_tokens {
            self.usage.output_tokens = output;
        }
        if info.cache_creation_input_tokens.is_some() {
            self.usage.cache_creation_tokens = info.cache_creation_input_tokens;
        }
        if info.cache_read_input_tokens.is_some() {
            self.usage.cache_read_tokens = info.cache_read_input_tokens;
        }
    }

    fn finish(self) -> MessageEvent {
        if let Some((error_type, message)) = self.error {
            return MessageEvent::Error {
                error_type,
                message,
            };
        }
        if !self.stopped {
            return MessageEvent::Error {
                error_type: "incomplete_stream".to_string(),
                message: "stream ended before message_stop".to_string(),
            };
        }

        let content: Vec<ContentBlock> = self
            .blocks
            .into_iter()
            .filter_map(|block| match block {
                PartialBlock::Text { text } if !text.is_empty() => Some(ContentBlock::text(text)),
                PartialBlock::ToolUse {
                    id,
                    name,
                    input_json,
                } => Some(ContentBlock::tool_use(id, name, parse_tool_input(&input_json))),
                _ => None,
            })
            .collect();

        MessageEvent::Done {
            message: Message::assistant(content),
            stop_reason: self.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: self.usage,
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &str, data: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Unparseable {} payload: {}", event, e);
            None
        }
    }
}

/// Tools without arguments stream no JSON at all.
fn parse_tool_input(input_json: &str) -> serde_json::Value {
    if input_json.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(input_json).unwrap_or(serde_json::Value::Null)
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<SystemBlock<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemBlock<'a> {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: serde_json::Value,
}

// ============================================================================
// Response event types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageStartEvent {
    message: MessageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    usage: UsageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct UsageInfo {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    cache_creation_input_tokens: Option<u32>,
    cache_read_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStartEvent {
    index: usize,
    content_block: ContentBlockInfo,
}

#[derive(Debug, Deserialize)]
struct ContentBlockInfo {
    #[serde(rename = "type")]
    block_type: String,
    id: Option<String>,
    name: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDeltaEvent {
    index: usize,
    delta: DeltaInfo,
}

#[derive(Debug, Deserialize)]
struct DeltaInfo {
    #[serde(rename = "type")]
    delta_type: String,
    text: Option<String>,
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStopEvent {
    index: usize,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEvent {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, ToolDefinition};
    use serde_json::json;

    fn test_model() -> Model {
        crate::models::custom_model("claude-test")
    }

    fn feed(acc: &mut StreamAccumulator, events: &[(&str, serde_json::Value)]) -> Vec<MessageEvent> {
        events
            .iter()
            .flat_map(|(name, data)| acc.handle(name, &data.to_string()))
            .collect()
    }

    #[test]
    fn test_request_marks_system_prompt_for_caching() {
        let model = test_model();
        let context = Context {
            system_prompt: Some("be brief".into()),
            messages: vec![Message::user_blocks(vec![ContentBlock::text("hi").cached()])],
            tools: vec![ToolDefinition::new("view", "View a path", json!({"properties": {}}))],
        };
        let request = build_request(&model, &context, &StreamOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["system"][0]["cache_control"], json!({"type": "ephemeral"}));
        assert_eq!(value["messages"][0]["content"][0]["cache_control"], json!({"type": "ephemeral"}));
        assert_eq!(value["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(value["max_tokens"], model.max_tokens);
        assert_eq!(value["stream"], true);
    }

    #[test]
    fn test_request_omits_empty_tools() {
        let model = test_model();
        let context = Context::default();
        let value = serde_json::to_value(build_request(&model, &context, &StreamOptions::default())).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("system").is_none());
    }

    #[test]
    fn test_accumulates_text_reply() {
        let mut acc = StreamAccumulator::default();
        let events = feed(
            &mut acc,
            &[
                ("message_start", json!({"message": {"usage": {"input_tokens": 10, "output_tokens": 1, "cache_read_input_tokens": 4}}})),
                ("content_block_start", json!({"index": 0, "content_block": {"type": "text", "text": ""}})),
                ("content_block_delta", json!({"index": 0, "delta": {"type": "text_delta", "text": "Hel"}})),
                ("content_block_delta", json!({"index": 0, "delta": {"type": "text_delta", "text": "lo"}})),
                ("content_block_stop", json!({"index": 0})),
                ("message_delta", json!({"delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 5}})),
                ("message_stop", json!({})),
            ],
        );

        let deltas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                MessageEvent::TextDelta { delta, .. } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert!(acc.is_finished());

        match acc.finish() {
            MessageEvent::Done {
                message,
                stop_reason,
                usage,
            } => {
                assert_eq!(message.text(), "Hello");
                assert_eq!(stop_reason, StopReason::EndTurn);
                assert_eq!(usage.input_tokens, 10);
                assert_eq!(usage.output_tokens, 5);
                assert_eq!(usage.cache_read_tokens, Some(4));
                assert_eq!(usage.cache_creation_tokens, None);
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_accumulates_tool_use_reply() {
        let mut acc = StreamAccumulator::default();
        feed(
            &mut acc,
            &[
                ("content_block_start", json!({"index": 0, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "view", "input": {}}})),
                ("content_block_delta", json!({"index": 0, "delta": {"type": "input_json_delta", "partial_json": "{\"path\": "}})),
                ("content_block_delta", json!({"index": 0, "delta": {"type": "input_json_delta", "partial_json": "\".\"}"}})),
                ("content_block_stop", json!({"index": 0})),
                ("content_block_start", json!({"index": 1, "content_block": {"type": "tool_use", "id": "toolu_2", "name": "noargs", "input": {}}})),
                ("content_block_stop", json!({"index": 1})),
                ("message_delta", json!({"delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 7}})),
                ("message_stop", json!({})),
            ],
        );

        match acc.finish() {
            MessageEvent::Done {
                message,
                stop_reason,
                ..
            } => {
                assert_eq!(stop_reason, StopReason::ToolUse);
                let invocations = message.tool_invocations();
                assert_eq!(invocations.len(), 2);
                assert_eq!(invocations[0].input, json!({"path": "."}));
                assert_eq!(invocations[1].input, json!({}));
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_error_event_terminates() {
        let mut acc = StreamAccumulator::default();
        feed(
            &mut acc,
            &[("error", json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}))],
        );
        assert!(acc.is_finished());
        assert_eq!(
            acc.finish(),
            MessageEvent::Error {
                error_type: "overloaded_error".into(),
                message: "Overloaded".into()
            }
        );
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let mut acc = StreamAccumulator::default();
        feed(
            &mut acc,
            &[("content_block_start", json!({"index": 0, "content_block": {"type": "text", "text": ""}}))],
        );
        assert!(!acc.is_finished());
        assert!(matches!(acc.finish(), MessageEvent::Error { .. }));
    }
}
