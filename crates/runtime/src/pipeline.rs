//! The stage pipeline.
//!
//! Stages run in ascending `order` with a stable tie-break by
//! registration order. A stage failure never escapes: the driver
//! classifies it into `llm_error` and keeps going so the feedback
//! guarantee can still produce a reply.

use std::sync::Arc;

use herald_domain::Result;
use herald_providers::classifier;

use crate::context::TurnContext;

/// One processing stage of a turn.
///
/// `is_enabled` is a static wiring switch; `should_process` gates on
/// the current turn's context.
#[async_trait::async_trait]
pub trait TurnStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn order(&self) -> u32;

    fn is_enabled(&self) -> bool {
        true
    }

    fn should_process(&self, ctx: &TurnContext) -> bool;

    async fn process(&self, ctx: &mut TurnContext) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Arc<dyn TurnStage>>,
}

impl Pipeline {
    pub fn new(mut stages: Vec<Arc<dyn TurnStage>>) -> Self {
        // sort_by_key is stable: equal orders keep registration order.
        stages.sort_by_key(|s| s.order());
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Drive one turn through all stages. Never fails.
    pub async fn run(&self, ctx: &mut TurnContext) {
        for stage in &self.stages {
            if !stage.is_enabled() {
                continue;
            }
            if !stage.should_process(ctx) {
                tracing::trace!(stage = stage.name(), "stage skipped");
                continue;
            }
            tracing::debug!(stage = stage.name(), order = stage.order(), "stage running");
            if let Err(e) = stage.process(ctx).await {
                let code = classifier::classify_diagnostic(Some(&e.to_string()));
                tracing::warn!(stage = stage.name(), error = %e, code = %code, "stage failed");
                ctx.llm_error = Some(code);
            }
        }
    }
}
