//! Conversation view building.
//!
//! Derives the message list sent to the LLM from raw session history.
//! Raw history is never mutated here: every transformation produces
//! new messages.
//!
//! On a model switch, the flattening masker rewrites prior tool-call
//! rounds into opaque assistant text so the new model never sees tool
//! ids minted under another provider's wire format.

use herald_domain::message::{Message, Role};

/// Build the LLM request view: system prompt first, then history,
/// masked when `model_switch` is set.
pub fn build_conversation_view(
    system_prompt: Option<&str>,
    history: &[Message],
    model_switch: bool,
) -> Vec<Message> {
    let mut out = Vec::with_capacity(history.len() + 1);
    if let Some(prompt) = system_prompt {
        out.push(Message::system(prompt));
    }
    if model_switch {
        out.extend(mask_tool_messages(history));
    } else {
        out.extend_from_slice(history);
    }
    out
}

/// Replace tool-call structure with plain assistant text.
///
/// Assistant messages carrying tool calls keep their text plus a
/// `[masked: N tool call(s)]` marker; tool messages become assistant
/// messages headed by `[Tool result: <name>]`.
pub fn mask_tool_messages(messages: &[Message]) -> Vec<Message> {
    let mut transformed = 0usize;
    let mut out = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::Assistant if msg.has_tool_calls() => {
                let marker = format!("[masked: {} tool call(s)]", msg.tool_calls.len());
                let content = if msg.content_str().is_empty() {
                    marker
                } else {
                    format!("{} {marker}", msg.content_str())
                };
                tracing::debug!(
                    message_id = %msg.id,
                    tool_calls = msg.tool_calls.len(),
                    "masking assistant tool calls"
                );
                transformed += 1;
                out.push(Message {
                    content: Some(content),
                    tool_calls: Vec::new(),
                    ..msg.clone()
                });
            }
            Role::Tool => {
                let name = msg.tool_name.as_deref().unwrap_or("tool");
                let content = if msg.content_str().is_empty() {
                    format!("[Tool result: {name}]")
                } else {
                    format!("[Tool result: {name}] {}", msg.content_str())
                };
                tracing::debug!(message_id = %msg.id, tool = name, "masking tool result");
                transformed += 1;
                out.push(Message {
                    role: Role::Assistant,
                    content: Some(content),
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                    tool_name: None,
                    ..msg.clone()
                });
            }
            _ => out.push(msg.clone()),
        }
    }

    if transformed == 0 {
        tracing::debug!("no-op: no tool messages found");
    }
    out
}
