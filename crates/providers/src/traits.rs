use herald_domain::message::Message;
use herald_domain::stream::{BoxStream, StreamEvent, Usage};
use herald_domain::tool::{ToolCall, ToolDefinition};

use crate::error::LlmResult;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation messages to send (system prompt first).
    pub messages: Vec<Message>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Model identifier override. `None` lets the provider choose.
    pub model: Option<String>,
    /// Reasoning effort hint resolved from the model tier.
    pub reasoning_effort: Option<String>,
    /// Sampling temperature. `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Textual content. May be `None` alongside tool calls, or an
    /// empty string for a contentless final answer.
    pub content: Option<String>,
    /// Tool calls emitted by the model, in the order it produced them.
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    /// The model that actually produced the response.
    pub model: String,
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every LLM adapter must implement.
///
/// Adapters translate between these internal types and the wire
/// format of each provider's API; the runtime only ever sees this
/// surface.
#[async_trait::async_trait]
pub trait LlmPort: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: ChatRequest) -> LlmResult<ChatResponse>;

    /// Send a chat completion request and return a stream of events.
    ///
    /// The default implementation degrades to a buffered [`chat`] call
    /// for adapters without native streaming.
    async fn chat_stream(
        &self,
        req: ChatRequest,
    ) -> LlmResult<BoxStream<'static, LlmResult<StreamEvent>>> {
        let resp = self.chat(req).await?;
        let events = response_to_events(resp);
        Ok(Box::pin(futures_util::stream::iter(
            events.into_iter().map(Ok::<_, crate::error::LlmError>),
        )))
    }

    fn is_available(&self) -> bool {
        true
    }

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    fn supports_streaming(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        Vec::new()
    }

    fn current_model(&self) -> Option<String> {
        None
    }
}

/// Replay a buffered response as the equivalent event sequence.
fn response_to_events(resp: ChatResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if let Some(text) = resp.content {
        if !text.is_empty() {
            events.push(StreamEvent::Token { text });
        }
    }
    for call in resp.tool_calls {
        events.push(StreamEvent::ToolCallFinished {
            call_id: call.id,
            tool_name: call.name,
            arguments: call.arguments,
        });
    }
    events.push(StreamEvent::Done {
        usage: resp.usage,
        finish_reason: resp.finish_reason,
    });
    events
}
