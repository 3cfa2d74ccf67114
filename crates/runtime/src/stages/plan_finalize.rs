//! Plan finalization: move a collected plan to READY and surface the
//! approval request.

use std::sync::Arc;

use herald_domain::event::PlanReadyEvent;
use herald_domain::Result;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::state::RuntimeState;

use super::ORDER_PLAN_FINALIZE;

pub struct PlanFinalizationStage {
    state: Arc<RuntimeState>,
}

impl PlanFinalizationStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl TurnStage for PlanFinalizationStage {
    fn name(&self) -> &'static str {
        "plan-finalize"
    }

    fn order(&self) -> u32 {
        ORDER_PLAN_FINALIZE
    }

    fn is_enabled(&self) -> bool {
        self.state.plan.is_feature_enabled()
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        ctx.plan_mode_active && ctx.llm_response.is_some() && !ctx.has_pending_tool_calls()
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let chat_id = ctx.chat_id();

        let Some(plan) = self.state.plan.active_plan(&chat_id) else {
            // Plan mode flagged but nothing collected: just leave the branch.
            self.state.plan.deactivate_plan_mode(&chat_id);
            ctx.plan_mode_active = false;
            return Ok(());
        };

        if plan.steps.is_empty() {
            tracing::debug!(plan_id = %plan.id, "empty plan cancelled");
            self.state.plan.cancel_plan(&plan.id)?;
            ctx.plan_mode_active = false;
            return Ok(());
        }

        let ready = self.state.plan.finalize_plan(&plan.id)?;
        if self
            .state
            .plan_events
            .send(PlanReadyEvent {
                plan_id: ready.id.clone(),
                chat_id: chat_id.clone(),
            })
            .is_err()
        {
            tracing::warn!(plan_id = %ready.id, "plan-ready event receiver dropped");
        }
        ctx.plan_approval_needed = Some(ready.id.clone());

        // The approval summary rides on the turn's response.
        if let Some(response) = ctx.llm_response.as_mut() {
            let summary = ready.render_summary();
            let content = response.content_str().to_owned();
            response.content = Some(if content.is_empty() {
                summary
            } else {
                format!("{content}\n\n{summary}")
            });
        }

        tracing::info!(plan_id = %ready.id, steps = ready.steps.len(), "plan ready for approval");
        Ok(())
    }
}
