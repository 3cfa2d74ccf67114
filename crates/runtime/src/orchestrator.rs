//! The turn orchestrator.
//!
//! `process_message` is the single entry point for every channel
//! adapter: it resolves the session, enforces the rate limit,
//! persists the incoming message, and drives the stage pipeline to
//! completion. It never returns an error to the caller; failures
//! surface as the `llm_error` context field and a fallback reply.

use std::sync::Arc;

use herald_domain::event::{RuntimeEvent, RuntimeEventType};
use herald_domain::message::Message;

use crate::context::TurnContext;
use crate::pipeline::Pipeline;
use crate::ports::MSG_RATE_LIMITED;
use crate::stages::standard_pipeline;
use crate::state::RuntimeState;

pub struct Orchestrator {
    state: Arc<RuntimeState>,
    pipeline: Pipeline,
}

impl Orchestrator {
    /// Build an orchestrator with the standard stage wiring.
    pub fn new(state: Arc<RuntimeState>) -> Self {
        let pipeline = standard_pipeline(state.clone());
        Self { state, pipeline }
    }

    /// Build with a custom pipeline (tests, alternative wirings).
    pub fn with_pipeline(state: Arc<RuntimeState>, pipeline: Pipeline) -> Self {
        Self { state, pipeline }
    }

    /// Process one incoming message into (at most) one outgoing
    /// response. Returns the finished turn context for observability;
    /// callers that only deliver can drop it.
    pub async fn process_message(&self, incoming: Message) -> TurnContext {
        let channel_type = incoming.channel_type.clone().unwrap_or_default();
        let chat_id = incoming.chat_id.clone().unwrap_or_default();

        let session = self.state.sessions.get_or_create(&channel_type, &chat_id);

        // One turn in flight per session.
        let _permit = match self.state.session_locks.acquire(&channel_type, &chat_id).await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!(error = %e, %channel_type, %chat_id, "session lock unavailable");
                return TurnContext::new(session);
            }
        };

        // Pre-flight: rate limit. On deny the LLM is never invoked;
        // the user gets the localized rejection.
        let verdict = self.state.rate_limit.try_consume();
        if !verdict.allowed {
            let mut text = self.state.preferences.get_message(MSG_RATE_LIMITED);
            if let Some(retry) = verdict.retry_after {
                text.push_str(&format!(" Retry in {}s.", retry.as_secs()));
            }
            tracing::info!(%channel_type, %chat_id, "rate limited");
            self.deliver_direct(&channel_type, &chat_id, &text).await;
            return TurnContext::new(session);
        }

        // Intake: the incoming message joins raw history before the
        // context snapshot is taken.
        self.state.history.append_incoming(&session, incoming);

        let mut ctx = TurnContext::new(session);
        ctx.cancel = self.state.cancels.register(&channel_type, &chat_id);
        ctx.plan_mode_active = self.state.plan.is_plan_mode_active(&chat_id);
        ctx.runtime_events.push(RuntimeEvent::new(
            RuntimeEventType::TurnStarted,
            ctx.session_id(),
            Some(channel_type.clone()),
            Some(chat_id.clone()),
        ));

        self.pipeline.run(&mut ctx).await;

        self.state.cancels.remove(&channel_type, &chat_id);
        ctx
    }

    /// Best-effort direct send, bypassing the pipeline (rate-limit
    /// rejections).
    async fn deliver_direct(&self, channel_type: &str, chat_id: &str, text: &str) {
        let Some(channel) = self.state.channel_for(channel_type) else {
            tracing::debug!(%channel_type, "no channel adapter for rejection");
            return;
        };
        if let Err(e) = channel.send_message(chat_id, text, &[]).await {
            tracing::warn!(error = %e, %channel_type, "rejection send failed");
        }
    }
}
