//! The per-turn context stages operate on.
//!
//! The source of truth for "what happened this turn". Well-known
//! signals are typed fields; the `extensions` map is the escape hatch
//! for forward-compatible, namespaced extras.

use std::collections::HashMap;

use serde_json::Value;

use herald_domain::config::ModelTier;
use herald_domain::event::RuntimeEvent;
use herald_domain::message::Message;
use herald_domain::outcome::{OutgoingResponse, RoutingOutcome, TurnOutcome};
use herald_domain::tool::{ToolDefinition, ToolResult};
use herald_providers::ChatResponse;
use herald_sessions::SharedSession;
use herald_skills::Skill;

use crate::cancel::CancelToken;

/// What skill routing observed and decided for this turn.
#[derive(Debug, Default, Clone)]
pub struct RoutingInfo {
    pub skill: Option<String>,
    pub confidence: Option<f32>,
    pub reason: Option<String>,
    pub fragmented: bool,
    pub fragmentation_signals: usize,
    pub latency_ms: Option<u64>,
    pub llm_used: bool,
    pub error: Option<String>,
    pub outcome: Option<RoutingOutcome>,
}

/// Mutable state for one turn. Owned exclusively by the orchestrator;
/// stages mutate it through `&mut`. The session is shared by
/// reference; only the history writer (and intake) touch its message
/// list.
pub struct TurnContext {
    pub session: SharedSession,
    /// Snapshot of raw history taken at intake (incoming message
    /// included). Stages read this; they never write it back.
    pub messages: Vec<Message>,

    pub available_tools: Vec<ToolDefinition>,
    pub tool_results: HashMap<String, ToolResult>,

    pub active_skill: Option<Skill>,
    /// Set by a stage to switch the active skill before prompt
    /// assembly; cleared once applied.
    pub skill_transition: Option<String>,
    pub model_tier: Option<ModelTier>,
    pub current_iteration: usize,
    pub system_prompt: Option<String>,

    // ── Well-known signals ─────────────────────────────────────────
    pub outgoing_response: Option<OutgoingResponse>,
    pub llm_response: Option<ChatResponse>,
    /// Classified error code; set by the pipeline driver or the loop.
    pub llm_error: Option<String>,
    pub loop_complete: bool,
    pub final_answer_ready: bool,
    pub plan_mode_active: bool,
    /// Plan id awaiting user approval.
    pub plan_approval_needed: Option<String>,
    pub plan_set_content_requested: bool,
    pub routing: RoutingInfo,
    pub runtime_events: Vec<RuntimeEvent>,
    pub response_sent: bool,
    pub turn_outcome: Option<TurnOutcome>,

    pub cancel: CancelToken,
    /// Namespaced extras for stages the core doesn't know about.
    pub extensions: HashMap<String, Value>,
}

impl TurnContext {
    pub fn new(session: SharedSession) -> Self {
        let messages = session.read().messages.clone();
        Self {
            session,
            messages,
            available_tools: Vec::new(),
            tool_results: HashMap::new(),
            active_skill: None,
            skill_transition: None,
            model_tier: None,
            current_iteration: 0,
            system_prompt: None,
            outgoing_response: None,
            llm_response: None,
            llm_error: None,
            loop_complete: false,
            final_answer_ready: false,
            plan_mode_active: false,
            plan_approval_needed: None,
            plan_set_content_requested: false,
            routing: RoutingInfo::default(),
            runtime_events: Vec::new(),
            response_sent: false,
            turn_outcome: None,
            cancel: CancelToken::new(),
            extensions: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> String {
        self.session.read().id.clone()
    }

    pub fn channel_type(&self) -> String {
        self.session.read().channel_type.clone()
    }

    pub fn chat_id(&self) -> String {
        self.session.read().chat_id.clone()
    }

    /// True when the turn was machine-triggered (`auto.mode` metadata
    /// on the last message of the intake snapshot).
    pub fn is_auto(&self) -> bool {
        self.messages.last().map(Message::is_auto).unwrap_or(false)
    }

    /// Text of the most recent user message in the intake snapshot.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == herald_domain::Role::User)
            .map(|m| m.content_str().to_string())
    }

    /// True while the last LLM response still carries unexecuted tool
    /// calls (the loop is mid-round).
    pub fn has_pending_tool_calls(&self) -> bool {
        self.llm_response
            .as_ref()
            .map(ChatResponse::has_tool_calls)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_domain::keys;
    use herald_sessions::AgentSession;

    fn ctx_with(messages: Vec<Message>) -> TurnContext {
        let session = AgentSession::new("test", "c1").into_shared();
        session.write().messages = messages;
        TurnContext::new(session)
    }

    #[test]
    fn auto_reads_last_message_only() {
        let auto_msg =
            Message::user("tick").with_metadata(keys::AUTO_MODE, serde_json::json!(true));
        assert!(ctx_with(vec![Message::user("hi"), auto_msg]).is_auto());
        assert!(!ctx_with(vec![Message::user("hi")]).is_auto());
        assert!(!ctx_with(vec![]).is_auto());
    }

    #[test]
    fn last_user_text_skips_assistant() {
        let ctx = ctx_with(vec![Message::user("question"), Message::assistant("answer")]);
        assert_eq!(ctx.last_user_text().as_deref(), Some("question"));
    }

    #[test]
    fn snapshot_taken_at_construction() {
        let session = AgentSession::new("test", "c1").into_shared();
        session.write().messages.push(Message::user("before"));
        let ctx = TurnContext::new(session.clone());
        session.write().messages.push(Message::user("after"));
        assert_eq!(ctx.messages.len(), 1);
    }
}
