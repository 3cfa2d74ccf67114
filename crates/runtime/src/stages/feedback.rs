//! Feedback guarantee: every non-auto turn that reaches routing has
//! something to say, even when everything upstream failed.

use std::sync::Arc;

use herald_domain::outcome::OutgoingResponse;
use herald_domain::Result;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::ports::MSG_GENERIC_FEEDBACK;
use crate::state::RuntimeState;

use super::ORDER_FEEDBACK;

pub struct FeedbackGuaranteeStage {
    state: Arc<RuntimeState>,
}

impl FeedbackGuaranteeStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl TurnStage for FeedbackGuaranteeStage {
    fn name(&self) -> &'static str {
        "feedback-guarantee"
    }

    fn order(&self) -> u32 {
        ORDER_FEEDBACK
    }

    /// Skips auto turns, turns that already produced a response (an
    /// explicit outgoing response or a final answer for routing to
    /// pick up), and turns with a pending skill transition.
    fn should_process(&self, ctx: &TurnContext) -> bool {
        !ctx.is_auto()
            && ctx.outgoing_response.is_none()
            && !ctx.final_answer_ready
            && ctx.skill_transition.is_none()
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let text = self.state.preferences.get_message(MSG_GENERIC_FEEDBACK);
        tracing::debug!("feedback guarantee filled the outgoing response");
        ctx.outgoing_response = Some(OutgoingResponse::text_only(text));
        Ok(())
    }
}
