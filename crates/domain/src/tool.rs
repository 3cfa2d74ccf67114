//! Tool call types shared between the loop, the executor, and the
//! provider adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keys;

/// A tool invocation proposed by the model. Ids are opaque strings,
/// unique within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

/// Why a tool execution did not produce a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolFailureKind {
    ExecutionFailed,
    PolicyDenied,
    ValidationFailed,
    Timeout,
    NotFound,
}

/// The result of executing (or refusing to execute) one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success { output: String },
    Failure { kind: ToolFailureKind, message: String },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }
}

/// What the tool loop records for one call: the result, the content
/// appended to history, and whether the outcome was synthesized by the
/// loop (policy denial, confirmation refusal, plan interception)
/// rather than produced by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionOutcome {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: ToolResult,
    /// Content of the tool-role message written to history.
    pub message_content: String,
    pub synthetic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolExecutionOutcome {
    pub fn success(call: &ToolCall, output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            message_content: output.clone(),
            result: ToolResult::Success { output },
            synthetic: false,
            metadata: None,
        }
    }

    pub fn failure(call: &ToolCall, kind: ToolFailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            message_content: message.clone(),
            result: ToolResult::Failure { kind, message },
            synthetic: false,
            metadata: None,
        }
    }

    /// A loop-synthesized failure (the executor was never invoked, or
    /// its error was converted into an outcome).
    pub fn synthetic(call: &ToolCall, kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            synthetic: true,
            ..Self::failure(call, kind, message)
        }
    }

    /// A loop-synthesized success, e.g. a plan-mode interception.
    pub fn synthetic_success(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            synthetic: true,
            ..Self::success(call, content)
        }
    }

    /// Mark this outcome as a plan-step recording.
    pub fn planned(mut self) -> Self {
        let meta = self.metadata.get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = meta {
            map.insert(keys::PLANNED.into(), Value::Bool(true));
        }
        self
    }

    pub fn is_planned(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(keys::PLANNED))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
