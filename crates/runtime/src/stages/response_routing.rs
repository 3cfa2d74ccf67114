//! Response routing: deliver the composed response through the
//! channel adapter matching the session's channel type.

use std::sync::Arc;

use herald_domain::event::{RuntimeEvent, RuntimeEventType};
use herald_domain::outcome::{OutgoingResponse, RoutingOutcome};
use herald_domain::Result;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::state::RuntimeState;

use super::ORDER_RESPONSE_ROUTING;

pub struct ResponseRoutingStage {
    state: Arc<RuntimeState>,
}

impl ResponseRoutingStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl TurnStage for ResponseRoutingStage {
    fn name(&self) -> &'static str {
        "response-routing"
    }

    fn order(&self) -> u32 {
        ORDER_RESPONSE_ROUTING
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        !ctx.response_sent
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let channel_type = ctx.channel_type();
        let chat_id = ctx.chat_id();

        // Close out the turn lifecycle before delivery so the event
        // rides the same dispatch.
        let closing = if ctx.llm_error.is_some() {
            RuntimeEventType::TurnFailed
        } else {
            RuntimeEventType::TurnFinished
        };
        ctx.runtime_events.push(RuntimeEvent::new(
            closing,
            ctx.session_id(),
            Some(channel_type.clone()),
            Some(chat_id.clone()),
        ));

        // Precedence: an explicit outgoing response wins over raw LLM
        // content; LLM content is only routable once final. The
        // routable text is materialized as the outgoing response so
        // every sent turn carries one.
        if ctx.outgoing_response.is_none() && ctx.final_answer_ready {
            if let Some(response) = &ctx.llm_response {
                ctx.outgoing_response =
                    Some(OutgoingResponse::text_only(response.content_str()));
            }
        }
        let payload = ctx
            .outgoing_response
            .as_ref()
            .map(|resp| (resp.text.clone(), resp.voice_requested, resp.attachments.clone()));

        let mut outcome = RoutingOutcome::default();

        match self.state.channel_for(&channel_type) {
            None => {
                tracing::debug!(%channel_type, "no channel adapter registered; skipping send");
            }
            Some(channel) => {
                if let Some((text, voice_requested, attachments)) = payload {
                    outcome.attempted = true;
                    outcome.channel_type = Some(channel_type.clone());
                    match channel.send_message(&chat_id, &text, &attachments).await {
                        Ok(()) => outcome.sent_text = true,
                        Err(e) => {
                            tracing::warn!(error = %e, %channel_type, "channel send failed");
                            outcome.error = Some(e.to_string());
                        }
                    }

                    if voice_requested && self.state.voice.is_available() {
                        match self
                            .state
                            .voice
                            .try_send_voice(&ctx.session, &chat_id, &text)
                            .await
                        {
                            Ok(sent) => outcome.sent_voice = sent,
                            Err(e) => {
                                tracing::warn!(error = %e, "voice send failed");
                                outcome.error.get_or_insert_with(|| e.to_string());
                            }
                        }
                    }
                }
            }
        }

        // Runtime events fan out to whichever adapter matches each
        // event's own channel type.
        for event in &ctx.runtime_events {
            let Some(event_channel) = event.channel_type.as_deref() else {
                continue;
            };
            let Some(target_chat) = event.chat_id.as_deref() else {
                continue;
            };
            if let Some(adapter) = self.state.channel_for(event_channel) {
                if let Err(e) = adapter.send_runtime_event(target_chat, event).await {
                    tracing::debug!(error = %e, event = ?event.event_type, "runtime event send failed");
                }
            }
        }

        ctx.response_sent = outcome.sent_text || outcome.sent_voice;
        ctx.routing.outcome = Some(outcome);
        Ok(())
    }
}
