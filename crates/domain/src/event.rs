//! Runtime and plan lifecycle events.
//!
//! Events travel over channels the orchestrator injects; there is no
//! global event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeEventType {
    TurnStarted,
    TurnFinished,
    TurnFailed,
}

/// A turn-lifecycle event delivered to channel adapters whose channel
/// type matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub event_type: RuntimeEventType,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub channel_type: Option<String>,
    pub chat_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl RuntimeEvent {
    pub fn new(
        event_type: RuntimeEventType,
        session_id: impl Into<String>,
        channel_type: Option<String>,
        chat_id: Option<String>,
    ) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            channel_type,
            chat_id,
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Published when a collected plan transitions to READY and is waiting
/// for user approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReadyEvent {
    pub plan_id: String,
    pub chat_id: String,
}
