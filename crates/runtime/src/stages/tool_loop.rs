//! The tool loop: the inner LLM⇄tool iteration of one turn.
//!
//! Alternates model calls and tool executions until the model returns
//! a final answer, the iteration cap is hit, the call fails, or the
//! turn is cancelled. Owns all history appends for the turn and the
//! conversation-view flattening on model switch.

use std::sync::Arc;
use std::time::Instant;

use herald_domain::outcome::{OutgoingResponse, TurnOutcome};
use herald_domain::stream::LlmUsage;
use herald_domain::tool::{ToolCall, ToolExecutionOutcome, ToolFailureKind};
use herald_domain::Result;
use herald_providers::{classifier, ChatRequest, ChatResponse};

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::plan::tools::PLAN_SET_CONTENT;
use crate::state::RuntimeState;
use crate::view::build_conversation_view;

use super::ORDER_TOOL_LOOP;

pub struct ToolLoopStage {
    state: Arc<RuntimeState>,
}

impl ToolLoopStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }

    /// Resolve the model for this turn and detect a model switch
    /// against the session's `llm.model` metadata.
    fn resolve_model(&self, ctx: &TurnContext) -> (String, Option<String>, bool) {
        let selection = self.state.model_selection.resolve(ctx.model_tier);
        let mut session = ctx.session.write();
        let switched = match session.last_model() {
            Some(previous) => previous != selection.model,
            None => false,
        };
        if switched || session.last_model().is_none() {
            session.set_last_model(&selection.model);
        }
        (selection.model, selection.reasoning_effort, switched)
    }

    fn record_usage(&self, ctx: &TurnContext, response: &ChatResponse, latency_ms: u64) {
        let Some(usage) = response.usage else {
            return;
        };
        let record = LlmUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            latency_ms,
            timestamp: chrono::Utc::now(),
            session_id: ctx.session_id(),
            model: response.model.clone(),
            provider_id: self.state.llm.provider_id().to_owned(),
        };
        // Best-effort: a broken tracker never breaks the turn.
        if let Err(e) = self
            .state
            .usage
            .record_usage(self.state.llm.provider_id(), &response.model, record)
        {
            tracing::warn!(error = %e, "usage tracking failed");
        }
    }

    /// Handle one tool call: plan interception, the `plan_set_content`
    /// control tool, confirmation gating, then the executor.
    async fn dispatch_call(&self, ctx: &mut TurnContext, call: &ToolCall) -> ToolExecutionOutcome {
        // Plan mode collects instead of executing.
        if ctx.plan_mode_active {
            let plan_id = self.state.plan.activate_plan_mode(&ctx.chat_id());
            let description = serde_json::to_string(&call.arguments).unwrap_or_default();
            return match self
                .state
                .plan
                .add_step(&plan_id, &call.name, Some(call.arguments.clone()), &description)
            {
                Ok(step) => ToolExecutionOutcome::synthetic_success(
                    call,
                    format!("Recorded as plan step {}: {}", step.order, call.name),
                )
                .planned(),
                Err(e) => {
                    tracing::warn!(error = %e, tool = %call.name, "plan step recording failed");
                    ToolExecutionOutcome::synthetic(
                        call,
                        ToolFailureKind::ExecutionFailed,
                        e.to_string(),
                    )
                }
            };
        }

        // Control tool: request a plan-content update, never execute.
        if call.name == PLAN_SET_CONTENT {
            ctx.plan_set_content_requested = true;
            return ToolExecutionOutcome::synthetic_success(call, "plan content update requested");
        }

        // Confirmation gate for risky tools.
        if let Some(tool) = self.state.tool_registry.get(&call.name) {
            if tool.requires_confirmation() {
                match self.state.confirmations.ask(&call.name, &call.arguments).await {
                    Ok(true) => {}
                    Ok(false) => {
                        return ToolExecutionOutcome::synthetic(
                            call,
                            ToolFailureKind::PolicyDenied,
                            format!("user declined {}", call.name),
                        );
                    }
                    Err(e) => {
                        return ToolExecutionOutcome::synthetic(
                            call,
                            ToolFailureKind::PolicyDenied,
                            format!("confirmation unavailable: {e}"),
                        );
                    }
                }
            }
        }

        self.state.tool_executor.execute(call).await
    }

    async fn run_loop(&self, ctx: &mut TurnContext) -> TurnOutcome {
        let (model, reasoning_effort, model_switch) = self.resolve_model(ctx);
        let max_iterations = self.state.config.max_iterations;

        for iteration in 0..max_iterations {
            // Cooperative cancellation between iterations.
            if ctx.cancel.is_cancelled() {
                tracing::debug!(iteration, "turn cancelled");
                return TurnOutcome::cancelled();
            }

            ctx.current_iteration = iteration;

            let history = ctx.session.read().messages.clone();
            let view = build_conversation_view(ctx.system_prompt.as_deref(), &history, model_switch);
            let request = ChatRequest {
                messages: view,
                tools: ctx.available_tools.clone(),
                model: Some(model.clone()),
                reasoning_effort: reasoning_effort.clone(),
                temperature: None,
                max_tokens: None,
            };

            tracing::debug!(iteration, model = %model, "tool loop iteration");
            let started = Instant::now();
            let response = match self.state.llm.chat(request).await {
                Ok(r) => r,
                Err(e) => {
                    let code = classifier::classify_error(&e);
                    tracing::warn!(error = %e, code = %code, "LLM call failed");
                    ctx.llm_error = Some(code.clone());
                    return TurnOutcome::llm_error(code);
                }
            };
            self.record_usage(ctx, &response, started.elapsed().as_millis() as u64);

            // Final answer: content (possibly empty) with no tool calls.
            if !response.has_tool_calls() {
                let content = response.content_str().to_owned();
                self.state
                    .history
                    .append_final_assistant(&ctx.session, &content);
                ctx.final_answer_ready = true;
                ctx.loop_complete = true;
                ctx.llm_response = Some(response);
                return TurnOutcome::success(content);
            }

            // Tool round: persist the assistant message, then execute
            // calls sequentially in the order the model returned them.
            self.state.history.append_assistant(
                &ctx.session,
                response.content.clone().filter(|c| !c.is_empty()),
                response.tool_calls.clone(),
            );

            for call in &response.tool_calls {
                let outcome = self.dispatch_call(ctx, call).await;
                self.state.history.append_tool(
                    &ctx.session,
                    &call.id,
                    &call.name,
                    &outcome.message_content,
                );
                ctx.tool_results.insert(call.id.clone(), outcome.result.clone());
            }

            ctx.llm_response = Some(response);
        }

        // Iteration cap: surface the last response text, if any.
        tracing::warn!(max_iterations, "tool loop limit reached");
        let last_text = ctx
            .llm_response
            .as_ref()
            .map(|r| r.content_str().to_owned())
            .filter(|t| !t.is_empty());
        if let Some(text) = &last_text {
            ctx.outgoing_response = Some(OutgoingResponse::text_only(text.clone()));
        }
        TurnOutcome::tool_limit(last_text)
    }
}

#[async_trait::async_trait]
impl TurnStage for ToolLoopStage {
    fn name(&self) -> &'static str {
        "tool-loop"
    }

    fn order(&self) -> u32 {
        ORDER_TOOL_LOOP
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        ctx.llm_error.is_none() && !(ctx.loop_complete && ctx.final_answer_ready)
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let outcome = self.run_loop(ctx).await;
        tracing::debug!(finish = ?outcome.finish_reason, "tool loop finished");
        ctx.turn_outcome = Some(outcome);
        Ok(())
    }
}
