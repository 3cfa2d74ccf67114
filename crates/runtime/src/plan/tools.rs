//! Plan control tools advertised while plan mode is active.

use std::sync::Arc;

use serde_json::Value;

use herald_domain::tool::ToolDefinition;
use herald_domain::Result;
use herald_tools::ToolComponent;

use super::PlanService;

/// Control tool intercepted by the loop; never executed externally.
pub const PLAN_SET_CONTENT: &str = "plan_set_content";
/// Read-only plan inspection tool.
pub const PLAN_GET: &str = "plan_get";

/// The model calls this to request a plan-content update. The loop
/// intercepts the call and only records the request flag, so this
/// component exists for its definition; `execute` is a no-op
/// acknowledgement in case a wiring dispatches it anyway.
pub struct PlanSetContentTool;

#[async_trait::async_trait]
impl ToolComponent for PlanSetContentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: PLAN_SET_CONTENT.into(),
            description: "Replace the working plan description shown to the user.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "New plan description" }
                },
                "required": ["content"]
            }),
        }
    }

    async fn execute(&self, _arguments: &Value) -> Result<String> {
        Ok("plan content update requested".into())
    }
}

/// Renders the active plan for the model.
pub struct PlanGetTool {
    service: Arc<PlanService>,
}

impl PlanGetTool {
    pub fn new(service: Arc<PlanService>) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl ToolComponent for PlanGetTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: PLAN_GET.into(),
            description: "Read back the steps collected in the current plan.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "chat_id": { "type": "string", "description": "Chat whose plan to read" }
                },
                "required": ["chat_id"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<String> {
        let chat_id = arguments
            .get("chat_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(match self.service.active_plan(chat_id) {
            Some(plan) => plan.render_summary(),
            None => "no active plan".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plan_get_renders_active_plan() {
        let svc = Arc::new(PlanService::new(true));
        let id = svc.activate_plan_mode("c1");
        svc.add_step(&id, "shell", None, "echo hi").unwrap();

        let tool = PlanGetTool::new(svc.clone());
        let out = tool
            .execute(&serde_json::json!({"chat_id": "c1"}))
            .await
            .unwrap();
        assert!(out.contains("1. shell"));

        let none = tool
            .execute(&serde_json::json!({"chat_id": "other"}))
            .await
            .unwrap();
        assert_eq!(none, "no active plan");
    }
}
