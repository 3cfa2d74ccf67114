//! The history writer: the single append path into raw session
//! history.
//!
//! Every appended message is stamped with the writer's clock and
//! inherits the session's channel/chat identity. The writer never
//! reorders or removes; each append is atomic under the session lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use herald_domain::message::Message;
use herald_domain::tool::ToolCall;

use crate::session::SharedSession;

/// Time source for history stamps. Injectable so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock default.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct HistoryWriter {
    clock: Arc<dyn Clock>,
}

impl Default for HistoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryWriter {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Append the incoming user message as-is (intake path). The
    /// message keeps its own timestamp; the session's `updated_at`
    /// moves to the writer's clock.
    pub fn append_incoming(&self, session: &SharedSession, message: Message) {
        let mut s = session.write();
        s.updated_at = self.clock.now();
        s.messages.push(message);
    }

    /// Append an assistant message, optionally carrying tool calls.
    pub fn append_assistant(
        &self,
        session: &SharedSession,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        let message = Message::assistant_with_tool_calls(content, tool_calls);
        self.push(session, message);
    }

    /// Append a tool-result message for one tool call.
    pub fn append_tool(
        &self,
        session: &SharedSession,
        tool_call_id: &str,
        tool_name: &str,
        content: &str,
    ) {
        let message = Message::tool_result(tool_call_id, tool_name, content);
        self.push(session, message);
    }

    /// Append the turn's final assistant message.
    pub fn append_final_assistant(&self, session: &SharedSession, content: &str) {
        let message = Message::assistant(content);
        self.push(session, message);
    }

    fn push(&self, session: &SharedSession, message: Message) {
        let mut s = session.write();
        let now = self.clock.now();
        let message = message
            .with_channel(s.channel_type.clone(), s.chat_id.clone())
            .with_timestamp(now);
        s.updated_at = now;
        s.messages.push(message);
    }
}
