//! Turn and routing outcome records.

use serde::{Deserialize, Serialize};

/// How a tool loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Success,
    ToolLimit,
    LlmError,
    Cancelled,
}

/// The final verdict of one turn's tool loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub finish_reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Success,
            assistant_text: Some(text.into()),
            error: None,
        }
    }

    pub fn tool_limit(last_text: Option<String>) -> Self {
        Self {
            finish_reason: FinishReason::ToolLimit,
            assistant_text: last_text,
            error: None,
        }
    }

    pub fn llm_error(code: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::LlmError,
            assistant_text: None,
            error: Some(code.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            finish_reason: FinishReason::Cancelled,
            assistant_text: None,
            error: None,
        }
    }
}

/// What response routing actually did for a turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub attempted: bool,
    pub sent_text: bool,
    pub sent_voice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The response queued for delivery. Takes precedence over raw LLM
/// response content when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingResponse {
    pub text: String,
    #[serde(default)]
    pub voice_requested: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl OutgoingResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_requested: false,
            attachments: Vec::new(),
        }
    }

    pub fn with_voice(mut self) -> Self {
        self.voice_requested = true;
        self
    }
}
