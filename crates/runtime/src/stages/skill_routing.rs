//! Skill routing: classify the incoming input to a skill and a model
//! tier via the matcher port.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Duration as ChronoDuration;

use herald_domain::message::{Message, Role};
use herald_domain::Result;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::state::RuntimeState;

use super::ORDER_SKILL_ROUTING;

pub struct SkillRoutingStage {
    state: Arc<RuntimeState>,
}

impl SkillRoutingStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }

    /// Aggregate the most recent user messages into one routing query,
    /// oldest first.
    fn routing_query(&self, ctx: &TurnContext) -> String {
        let depth = self.state.config.routing.query_depth;
        let mut texts: Vec<&str> = ctx
            .messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::User && !m.content_str().trim().is_empty())
            .take(depth)
            .map(Message::content_str)
            .collect();
        texts.reverse();
        texts.join("\n")
    }

    /// Count short user messages inside the fragmentation window,
    /// anchored at the newest message.
    fn analyze_fragmentation(&self, ctx: &TurnContext) -> (bool, usize) {
        let cfg = &self.state.config.routing;
        let Some(anchor) = ctx.messages.last().map(|m| m.timestamp) else {
            return (false, 0);
        };
        let window_start = anchor - ChronoDuration::seconds(cfg.fragment_window_secs);
        let signals = ctx
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .filter(|m| m.timestamp >= window_start)
            .filter(|m| {
                let len = m.content_str().trim().len();
                len > 0 && len <= cfg.fragment_max_len
            })
            .count();
        (signals >= cfg.fragment_min_signals, signals)
    }
}

#[async_trait::async_trait]
impl TurnStage for SkillRoutingStage {
    fn name(&self) -> &'static str {
        "skill-routing"
    }

    fn order(&self) -> u32 {
        ORDER_SKILL_ROUTING
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        ctx.current_iteration == 0 && !ctx.is_auto() && ctx.llm_error.is_none()
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let skills = self.state.skills.available();
        if skills.is_empty() || !self.state.skill_matcher.is_enabled() {
            return Ok(());
        }

        let query = self.routing_query(ctx);
        if query.trim().is_empty() {
            return Ok(());
        }

        let (fragmented, signals) = self.analyze_fragmentation(ctx);
        ctx.routing.fragmented = fragmented;
        ctx.routing.fragmentation_signals = signals;

        // Bring the matcher index up to date before the first match.
        if !self.state.skill_matcher.is_ready() {
            if let Err(e) = self.state.skill_matcher.index_skills(&skills).await {
                tracing::warn!(error = %e, "skill indexing failed");
                ctx.routing.error = Some(e.to_string());
                return Ok(());
            }
        }

        let recent: Vec<Message> = ctx.messages.iter().rev().take(8).rev().cloned().collect();
        let started = Instant::now();
        let timeout = Duration::from_millis(self.state.config.routing.timeout_ms);

        match tokio::time::timeout(
            timeout,
            self.state.skill_matcher.match_skill(&query, &skills, &recent),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "skill routing timed out");
                ctx.routing.error = Some("routing timed out".into());
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "skill matcher failed");
                ctx.routing.error = Some(e.to_string());
            }
            Ok(Ok(result)) => {
                ctx.model_tier = Some(result.model_tier);
                ctx.routing.confidence = Some(result.confidence);
                ctx.routing.reason = Some(result.reason.clone());
                ctx.routing.llm_used = result.llm_classifier_used;
                ctx.routing.latency_ms = Some(if result.latency_ms > 0 {
                    result.latency_ms
                } else {
                    started.elapsed().as_millis() as u64
                });

                if let Some(name) = result.selected_skill {
                    ctx.routing.skill = Some(name.clone());
                    match self.state.skills.get(&name) {
                        Some(skill) => ctx.active_skill = Some(skill),
                        None => {
                            tracing::warn!(skill = %name, "matcher selected unknown skill");
                        }
                    }
                }
                tracing::debug!(
                    skill = ctx.routing.skill.as_deref().unwrap_or("<none>"),
                    tier = %result.model_tier,
                    fragmented,
                    "skill routing decided"
                );
            }
        }

        Ok(())
    }
}
