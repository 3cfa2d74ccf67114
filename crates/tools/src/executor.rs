//! Executes one tool call and reports the outcome.
//!
//! The executor never panics and never returns an error: every
//! failure mode (unknown tool, component error, timeout) becomes a
//! [`ToolExecutionOutcome`] the loop can append to history.

use std::sync::Arc;
use std::time::Duration;

use herald_domain::tool::{ToolCall, ToolExecutionOutcome, ToolFailureKind};

use crate::registry::ToolRegistry;

/// Default hard cap on a single tool execution.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// The port the tool loop dispatches through.
#[async_trait::async_trait]
pub trait ToolExecutorPort: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolExecutionOutcome;
}

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    call_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl ToolExecutorPort for ToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolExecutionOutcome {
        let Some(tool) = self.registry.get(&call.name) else {
            tracing::warn!(tool = %call.name, "tool call for unknown tool");
            return ToolExecutionOutcome::failure(
                call,
                ToolFailureKind::NotFound,
                format!("unknown tool: {}", call.name),
            );
        };

        if !tool.is_enabled() {
            return ToolExecutionOutcome::failure(
                call,
                ToolFailureKind::PolicyDenied,
                format!("tool is disabled: {}", call.name),
            );
        }

        match tokio::time::timeout(self.call_timeout, tool.execute(&call.arguments)).await {
            Err(_) => {
                tracing::warn!(tool = %call.name, timeout = ?self.call_timeout, "tool call timed out");
                ToolExecutionOutcome::failure(
                    call,
                    ToolFailureKind::Timeout,
                    format!("tool timed out after {:?}", self.call_timeout),
                )
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                ToolExecutionOutcome::failure(call, ToolFailureKind::ExecutionFailed, e.to_string())
            }
            Ok(Ok(output)) => ToolExecutionOutcome::success(call, output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_domain::tool::{ToolDefinition, ToolResult};
    use herald_domain::{Error, Result};
    use serde_json::Value;

    use crate::ToolComponent;

    struct Echo;

    #[async_trait::async_trait]
    impl ToolComponent for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echo the text argument.".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }
        }

        async fn execute(&self, arguments: &Value) -> Result<String> {
            Ok(arguments
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl ToolComponent for Failing {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "failing".into(),
                description: "Always fails.".into(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, _arguments: &Value) -> Result<String> {
            Err(Error::Tool("boom".into()))
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl ToolComponent for Slow {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "slow".into(),
                description: "Sleeps.".into(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, _arguments: &Value) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("never".into())
        }
    }

    fn executor_with(tool: Arc<dyn ToolComponent>) -> ToolExecutor {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(tool);
        ToolExecutor::new(registry)
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "tc_1".into(),
            name: name.into(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn success_outcome_carries_output() {
        let exec = executor_with(Arc::new(Echo));
        let out = exec
            .execute(&call("echo", serde_json::json!({"text": "hello"})))
            .await;
        assert!(out.result.is_success());
        assert_eq!(out.message_content, "hello");
        assert!(!out.synthetic);
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let exec = executor_with(Arc::new(Echo));
        let out = exec.execute(&call("missing", serde_json::json!({}))).await;
        match out.result {
            ToolResult::Failure { kind, .. } => assert_eq!(kind, ToolFailureKind::NotFound),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn component_error_becomes_execution_failed() {
        let exec = executor_with(Arc::new(Failing));
        let out = exec.execute(&call("failing", serde_json::json!({}))).await;
        match out.result {
            ToolResult::Failure { kind, ref message } => {
                assert_eq!(kind, ToolFailureKind::ExecutionFailed);
                assert!(message.contains("boom"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let exec = executor_with(Arc::new(Slow)).with_timeout(Duration::from_millis(100));
        let out = exec.execute(&call("slow", serde_json::json!({}))).await;
        match out.result {
            ToolResult::Failure { kind, .. } => assert_eq!(kind, ToolFailureKind::Timeout),
            _ => panic!("expected timeout"),
        }
    }
}
