//! The session record shared across turns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use herald_domain::keys;
use herald_domain::message::{Message, Role};

/// A session is shared by reference between the orchestrator, the
/// history writer, and response routing. The message list is
/// append-only; only the history writer (and initial intake) may push
/// to it.
pub type SharedSession = Arc<RwLock<AgentSession>>;

/// Conversation state for one `(channel_type, chat_id)` pair.
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub id: String,
    pub channel_type: String,
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
    pub messages: Vec<Message>,
}

impl AgentSession {
    pub fn new(channel_type: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_type: channel_type.into(),
            chat_id: chat_id.into(),
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
            messages: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    /// The model that drove the previous turn (`llm.model` metadata).
    pub fn last_model(&self) -> Option<&str> {
        self.metadata.get(keys::LLM_MODEL).and_then(Value::as_str)
    }

    pub fn set_last_model(&mut self, model: &str) {
        self.metadata
            .insert(keys::LLM_MODEL.into(), Value::String(model.into()));
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_metadata_round_trips() {
        let mut session = AgentSession::new("telegram", "chat-1");
        assert!(session.last_model().is_none());
        session.set_last_model("gpt-a");
        assert_eq!(session.last_model(), Some("gpt-a"));
    }

    #[test]
    fn last_user_text_skips_other_roles() {
        let mut session = AgentSession::new("telegram", "chat-1");
        session.messages.push(Message::user("first"));
        session.messages.push(Message::assistant("reply"));
        assert_eq!(session.last_user_text(), Some("first"));
    }
}
