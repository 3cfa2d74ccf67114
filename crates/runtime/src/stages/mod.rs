//! The turn pipeline stages, in execution order:
//!
//! | order | stage |
//! |---|---|
//! | 15 | skill routing |
//! | 20 | context build |
//! | 30 | tool loop |
//! | 50 | memory persist |
//! | 58 | plan finalization |
//! | 59 | feedback guarantee |
//! | 70 | response routing |
//!
//! Plan-mode interception lives inside the tool loop; there is no
//! separate legacy-LLM wiring in this build. Any stage registered
//! behind the loop still honors the `loop_complete` /
//! `final_answer_ready` bypass signals.

pub mod context_build;
pub mod feedback;
pub mod memory_persist;
pub mod plan_finalize;
pub mod response_routing;
pub mod skill_routing;
pub mod tool_loop;

use std::sync::Arc;

use crate::pipeline::{Pipeline, TurnStage};
use crate::state::RuntimeState;

pub const ORDER_SKILL_ROUTING: u32 = 15;
pub const ORDER_CONTEXT_BUILD: u32 = 20;
pub const ORDER_TOOL_LOOP: u32 = 30;
pub const ORDER_MEMORY_PERSIST: u32 = 50;
pub const ORDER_PLAN_FINALIZE: u32 = 58;
pub const ORDER_FEEDBACK: u32 = 59;
pub const ORDER_RESPONSE_ROUTING: u32 = 70;

/// The standard pipeline wiring.
pub fn standard_pipeline(state: Arc<RuntimeState>) -> Pipeline {
    let stages: Vec<Arc<dyn TurnStage>> = vec![
        Arc::new(skill_routing::SkillRoutingStage::new(state.clone())),
        Arc::new(context_build::ContextBuildStage::new(state.clone())),
        Arc::new(tool_loop::ToolLoopStage::new(state.clone())),
        Arc::new(memory_persist::MemoryPersistStage::new(state.clone())),
        Arc::new(plan_finalize::PlanFinalizationStage::new(state.clone())),
        Arc::new(feedback::FeedbackGuaranteeStage::new(state.clone())),
        Arc::new(response_routing::ResponseRoutingStage::new(state)),
    ];
    Pipeline::new(stages)
}
