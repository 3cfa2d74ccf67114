//! The message/history model.
//!
//! Messages are value records: constructors and the `with_*` helpers
//! return new values, and [`flatten`] produces a new list without
//! touching its input. Raw session history is append-only; everything
//! that reshapes it (view building, tool-round flattening) works on
//! copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys;
use crate::tool::ToolCall;

/// Maximum characters of a tool result kept by [`flatten`] before the
/// segment is truncated with `...`.
const RESULT_PREVIEW_MAX: usize = 2000;

/// Maximum characters of serialized tool arguments in a flattened
/// `[Tool: ...]` segment.
const ARGS_PREVIEW_MAX: usize = 200;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a session's raw history.
///
/// A `Tool` message always carries `tool_call_id` and `tool_name`. An
/// `Assistant` message carries tool calls, a final `content`, or both.
/// The pair (assistant-with-tool-calls, subsequent tool messages with
/// matching ids) forms a *tool round*.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

// ── Constructors ───────────────────────────────────────────────────

impl Message {
    fn base(role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            timestamp: Utc::now(),
            channel_type: None,
            chat_id: None,
            metadata: Map::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::base(Role::System)
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::base(Role::User)
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::base(Role::Assistant)
        }
    }

    pub fn assistant_with_tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: text,
            tool_calls,
            ..Self::base(Role::Assistant)
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Self::base(Role::Tool)
        }
    }

    // ── Record-style helpers (consume self, return a new value) ────

    pub fn with_channel(
        mut self,
        channel_type: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        self.channel_type = Some(channel_type.into());
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// True when the metadata flag `key` is present and `true`.
    pub fn metadata_flag(&self, key: &str) -> bool {
        self.metadata.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// True for machine-triggered messages (`auto.mode` metadata).
    pub fn is_auto(&self) -> bool {
        self.metadata_flag(keys::AUTO_MODE)
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool-round flattening
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Collapse tool rounds into plain assistant text.
///
/// Each complete round (assistant-with-tool-calls plus the tool
/// messages answering it) becomes a single assistant message whose
/// content concatenates the original assistant text with one
/// `[Tool: <name>] <args>` / `[Result: ...]` segment per call. Orphan
/// tool messages become assistant messages with a `[Tool: <name>]`
/// header. Missing results render as `[Result: <no response>]`, empty
/// ones as `[Result: <empty>]`, and long ones are truncated.
///
/// The output contains no tool roles and no tool calls, so the
/// function is idempotent. The input is never mutated.
pub fn flatten(messages: &[Message]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        let msg = &messages[i];

        if msg.role == Role::Assistant && msg.has_tool_calls() {
            // Collect the round: consecutive tool messages whose ids
            // answer one of this assistant's calls.
            let ids: Vec<&str> = msg.tool_calls.iter().map(|c| c.id.as_str()).collect();
            let mut results: std::collections::HashMap<&str, &Message> =
                std::collections::HashMap::new();
            let mut j = i + 1;
            while j < messages.len() {
                let next = &messages[j];
                if next.role != Role::Tool {
                    break;
                }
                match next.tool_call_id.as_deref() {
                    Some(id) if ids.contains(&id) => {
                        results.entry(id).or_insert(next);
                        j += 1;
                    }
                    _ => break,
                }
            }

            let mut text = String::new();
            if !msg.content_str().is_empty() {
                text.push_str(msg.content_str());
            }
            for call in &msg.tool_calls {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&format!(
                    "[Tool: {}] {}",
                    call.name,
                    summarize_arguments(&call.arguments)
                ));
                text.push('\n');
                match results.get(call.id.as_str()) {
                    None => text.push_str("[Result: <no response>]"),
                    Some(r) if r.content_str().is_empty() => text.push_str("[Result: <empty>]"),
                    Some(r) => {
                        text.push_str("[Result: ");
                        text.push_str(&truncate_text(r.content_str(), RESULT_PREVIEW_MAX));
                        text.push(']');
                    }
                }
            }

            out.push(Message {
                content: Some(text),
                tool_calls: Vec::new(),
                tool_call_id: None,
                tool_name: None,
                ..msg.clone()
            });
            i = j;
        } else if msg.role == Role::Tool {
            // Orphan tool message, no matching assistant predecessor.
            let name = msg.tool_name.as_deref().unwrap_or("tool");
            let mut text = format!("[Tool: {name}]");
            if !msg.content_str().is_empty() {
                text.push('\n');
                text.push_str(&truncate_text(msg.content_str(), RESULT_PREVIEW_MAX));
            }
            out.push(Message {
                role: Role::Assistant,
                content: Some(text),
                tool_calls: Vec::new(),
                tool_call_id: None,
                tool_name: None,
                ..msg.clone()
            });
            i += 1;
        } else {
            out.push(msg.clone());
            i += 1;
        }
    }

    out
}

fn summarize_arguments(arguments: &Value) -> String {
    let rendered = match arguments {
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    truncate_text(&rendered, ARGS_PREVIEW_MAX)
}

/// Truncate to `max` bytes, backing up to a char boundary, appending
/// `...` when anything was cut.
fn truncate_text(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCall;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: serde_json::json!({"cmd": "echo hi"}),
        }
    }

    // ── Constructors ───────────────────────────────────────────────

    #[test]
    fn tool_result_carries_call_id_and_name() {
        let msg = Message::tool_result("tc_1", "shell", "hi\n");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("tc_1"));
        assert_eq!(msg.tool_name.as_deref(), Some("shell"));
        assert_eq!(msg.content_str(), "hi\n");
    }

    #[test]
    fn auto_flag_reads_metadata() {
        let msg = Message::user("ping").with_metadata(keys::AUTO_MODE, serde_json::json!(true));
        assert!(msg.is_auto());
        assert!(!Message::user("ping").is_auto());
    }

    #[test]
    fn with_channel_sets_both_fields() {
        let msg = Message::user("hi").with_channel("telegram", "chat-9");
        assert_eq!(msg.channel_type.as_deref(), Some("telegram"));
        assert_eq!(msg.chat_id.as_deref(), Some("chat-9"));
    }

    // ── flatten ────────────────────────────────────────────────────

    #[test]
    fn flatten_empty_is_empty() {
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn flatten_passes_plain_messages_through() {
        let msgs = vec![Message::user("q"), Message::assistant("a")];
        let flat = flatten(&msgs);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].role, Role::User);
        assert_eq!(flat[1].content_str(), "a");
    }

    #[test]
    fn flatten_collapses_complete_round() {
        let msgs = vec![
            Message::assistant_with_tool_calls(Some("running".into()), vec![call("tc1", "shell")]),
            Message::tool_result("tc1", "shell", "hello\n"),
        ];
        let flat = flatten(&msgs);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].role, Role::Assistant);
        assert!(flat[0].tool_calls.is_empty());
        let text = flat[0].content_str();
        assert!(text.starts_with("running\n[Tool: shell]"), "got: {text}");
        assert!(text.contains("[Result: hello\n]"));
    }

    #[test]
    fn flatten_missing_result_renders_no_response() {
        let msgs = vec![Message::assistant_with_tool_calls(
            None,
            vec![call("tc1", "shell")],
        )];
        let flat = flatten(&msgs);
        assert_eq!(flat.len(), 1);
        assert!(flat[0].content_str().contains("[Result: <no response>]"));
    }

    #[test]
    fn flatten_empty_result_renders_empty() {
        let msgs = vec![
            Message::assistant_with_tool_calls(None, vec![call("tc1", "shell")]),
            Message::tool_result("tc1", "shell", ""),
        ];
        let flat = flatten(&msgs);
        assert!(flat[0].content_str().contains("[Result: <empty>]"));
    }

    #[test]
    fn flatten_truncates_long_results() {
        let long = "x".repeat(3000);
        let msgs = vec![
            Message::assistant_with_tool_calls(None, vec![call("tc1", "shell")]),
            Message::tool_result("tc1", "shell", long),
        ];
        let flat = flatten(&msgs);
        let text = flat[0].content_str();
        assert!(text.contains("..."));
        assert!(text.len() < 2300);
    }

    #[test]
    fn flatten_orphan_tool_becomes_assistant() {
        let msgs = vec![Message::tool_result("tc9", "search", "found it")];
        let flat = flatten(&msgs);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].role, Role::Assistant);
        assert!(flat[0].content_str().starts_with("[Tool: search]"));
        assert!(flat[0].tool_call_id.is_none());
    }

    #[test]
    fn flatten_two_rounds_and_final() {
        let msgs = vec![
            Message::user("do it"),
            Message::assistant_with_tool_calls(None, vec![call("a", "read")]),
            Message::tool_result("a", "read", "file body"),
            Message::assistant_with_tool_calls(None, vec![call("b", "write")]),
            Message::tool_result("b", "write", "ok"),
            Message::assistant("done"),
        ];
        let flat = flatten(&msgs);
        assert_eq!(flat.len(), 4); // user, round a, round b, final
        assert!(flat[1].content_str().contains("[Tool: read]"));
        assert!(flat[2].content_str().contains("[Tool: write]"));
        assert_eq!(flat[3].content_str(), "done");
    }

    #[test]
    fn flatten_is_idempotent() {
        let msgs = vec![
            Message::user("q"),
            Message::assistant_with_tool_calls(Some("t".into()), vec![call("tc1", "shell")]),
            Message::tool_result("tc1", "shell", "out"),
            Message::tool_result("orphan", "other", "stray"),
        ];
        let once = flatten(&msgs);
        let twice = flatten(&once);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
            assert!(b.tool_calls.is_empty());
        }
    }

    #[test]
    fn flatten_does_not_mutate_input() {
        let msgs = vec![
            Message::assistant_with_tool_calls(None, vec![call("tc1", "shell")]),
            Message::tool_result("tc1", "shell", "out"),
        ];
        let before = serde_json::to_string(&msgs).unwrap();
        let _ = flatten(&msgs);
        assert_eq!(serde_json::to_string(&msgs).unwrap(), before);
    }

    // ── truncate_text ──────────────────────────────────────────────

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "h\u{00e9}llo"; // é is 2 bytes; cutting at 2 lands inside it
        assert_eq!(truncate_text(s, 2), "h...");
        assert_eq!(truncate_text("hello", 10), "hello");
    }
}
