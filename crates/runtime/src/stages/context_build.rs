//! Context building: assemble the system prompt and the advertised
//! tool set for the turn.

use std::collections::HashMap;
use std::sync::Arc;

use herald_domain::tool::ToolDefinition;
use herald_domain::Result;
use herald_tools::ToolComponent;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::plan::tools::{PlanGetTool, PlanSetContentTool};
use crate::state::RuntimeState;

use super::ORDER_CONTEXT_BUILD;

/// Identity line used when no prompt sections are configured.
const DEFAULT_IDENTITY: &str = "You are a helpful AI assistant.";

pub struct ContextBuildStage {
    state: Arc<RuntimeState>,
}

impl ContextBuildStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }

    fn template_variables(&self, ctx: &TurnContext) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("CHANNEL".to_string(), ctx.channel_type());
        vars.insert("CHAT_ID".to_string(), ctx.chat_id());
        vars.insert("SESSION_ID".to_string(), ctx.session_id());
        vars.insert(
            "DATE".to_string(),
            chrono::Utc::now().format("%Y-%m-%d").to_string(),
        );
        vars.insert(
            "ACTIVE_SKILL".to_string(),
            ctx.active_skill
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default(),
        );
        vars
    }

    /// Static tools, MCP tools for the active skill, and plan control
    /// tools when plan mode is active.
    async fn build_available_tools(&self, ctx: &TurnContext) -> Vec<ToolDefinition> {
        let mut tools = self.state.tool_registry.enabled_definitions();

        if let Some(skill) = ctx.active_skill.as_ref().filter(|s| s.mcp_config.is_some()) {
            match self.state.mcp.get_or_start_client(skill).await {
                Ok(defs) => {
                    for def in defs {
                        let adapter = self.state.mcp.create_tool_adapter(&skill.name, &def);
                        self.state.tool_registry.register(adapter);
                        if !tools.iter().any(|t| t.name == def.name) {
                            tools.push(def);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(skill = %skill.name, error = %e, "MCP client start failed");
                }
            }
        }

        if ctx.plan_mode_active {
            let set_content = PlanSetContentTool;
            let get = PlanGetTool::new(self.state.plan.clone());
            for def in [set_content.definition(), get.definition()] {
                if !tools.iter().any(|t| t.name == def.name) {
                    tools.push(def);
                }
            }
            self.state.tool_registry.register(Arc::new(set_content));
            self.state.tool_registry.register(Arc::new(get));
        }

        tools
    }
}

#[async_trait::async_trait]
impl TurnStage for ContextBuildStage {
    fn name(&self) -> &'static str {
        "context-build"
    }

    fn order(&self) -> u32 {
        ORDER_CONTEXT_BUILD
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        ctx.current_iteration == 0 && ctx.llm_error.is_none()
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        // A pending skill transition switches the active skill before
        // prompt assembly, then clears.
        if let Some(target) = ctx.skill_transition.take() {
            match self.state.skills.get(&target) {
                Some(skill) => {
                    tracing::debug!(skill = %target, "skill transition applied");
                    ctx.active_skill = Some(skill);
                }
                None => tracing::warn!(skill = %target, "skill transition target not found"),
            }
        }

        let vars = self.template_variables(ctx);
        let mut parts: Vec<String> = Vec::new();

        // 1. Templated sections, or the default identity line.
        let rendered = if self.state.sections.is_enabled() {
            self.state.sections.render(&vars)
        } else {
            String::new()
        };
        if rendered.is_empty() {
            parts.push(DEFAULT_IDENTITY.to_string());
        } else {
            parts.push(rendered);
        }

        // 2. Memory.
        let memory = self.state.memory.memory_context();
        if !memory.is_empty() {
            parts.push(format!("# Memory\n{memory}"));
        }

        // 3. RAG context. Skipped entirely when the port is down.
        if self.state.rag.is_available() {
            if let Some(query) = ctx.last_user_text() {
                match self.state.rag.query(&ctx.session_id(), &query).await {
                    Ok(context) if !context.trim().is_empty() => {
                        parts.push(format!("# Relevant Memory\n{context}"));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "RAG query failed"),
                }
            }
        }

        // 4. Active skill or the skills summary.
        match &ctx.active_skill {
            Some(skill) => {
                parts.push(format!("# Active Skill: {}\n{}", skill.name, skill.content));
                if skill.has_pipeline() {
                    let mut lines = vec!["# Skill Pipeline".to_string()];
                    if let Some(next) = &skill.next_skill {
                        lines.push(format!("- default next: {next}"));
                    }
                    for (condition, next) in &skill.conditional_next_skills {
                        lines.push(format!("- if {condition}: {next}"));
                    }
                    parts.push(lines.join("\n"));
                }
            }
            None => {
                let summary = self.state.skills.summary();
                if !summary.is_empty() {
                    parts.push(format!("# Available Skills\n{summary}"));
                }
            }
        }

        // 5. Tools.
        let tools = self.build_available_tools(ctx).await;
        if !tools.is_empty() {
            let listing = tools
                .iter()
                .map(|t| format!("- {}", t.name))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("# Available Tools\n{listing}"));
        }

        // 6. Auto-mode goals, plus the auto model tier.
        if ctx.is_auto() {
            ctx.model_tier = Some(self.state.config.auto.model_tier);
            let goals = self.state.auto_mode.goals();
            if !goals.is_empty() {
                parts.push(format!("# Goals\n{goals}"));
            }
        }

        ctx.available_tools = tools;
        ctx.system_prompt = Some(parts.join("\n\n"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_domain::config::{ModelTier, RuntimeConfig};
    use herald_domain::keys;
    use herald_domain::message::Message;
    use herald_providers::{ChatRequest, ChatResponse, LlmPort, LlmResult};
    use herald_sessions::AgentSession;
    use herald_skills::{PromptSection, PromptSectionService, Skill, SkillStore};

    struct DeadLlm;

    #[async_trait::async_trait]
    impl LlmPort for DeadLlm {
        async fn chat(&self, _req: ChatRequest) -> LlmResult<ChatResponse> {
            unreachable!("context tests never call the LLM")
        }

        fn provider_id(&self) -> &str {
            "dead"
        }
    }

    fn base_state() -> RuntimeState {
        let (state, _rx) = RuntimeState::new(RuntimeConfig::default(), Arc::new(DeadLlm));
        state
    }

    fn ctx_for(messages: Vec<Message>) -> TurnContext {
        let session = AgentSession::new("test", "c1").into_shared();
        session.write().messages = messages;
        TurnContext::new(session)
    }

    #[tokio::test]
    async fn empty_sections_fall_back_to_identity_line() {
        let state = Arc::new(base_state());
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);

        stage.process(&mut ctx).await.unwrap();
        let prompt = ctx.system_prompt.unwrap();
        assert!(prompt.starts_with(DEFAULT_IDENTITY));
    }

    #[tokio::test]
    async fn sections_render_with_variables() {
        let mut state = base_state();
        state.sections = Arc::new(PromptSectionService::new(vec![PromptSection::new(
            "identity",
            "Assistant for {{CHANNEL}}.",
            10,
        )]));
        let state = Arc::new(state);
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);

        stage.process(&mut ctx).await.unwrap();
        assert!(ctx
            .system_prompt
            .unwrap()
            .starts_with("Assistant for test."));
    }

    #[tokio::test]
    async fn active_skill_section_and_pipeline() {
        let mut skill = Skill::new("research", "Research things", "Use sources.");
        skill.next_skill = Some("summarize".into());
        skill
            .conditional_next_skills
            .insert("needs code".into(), "coding".into());

        let state = Arc::new(base_state());
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);
        ctx.active_skill = Some(skill);

        stage.process(&mut ctx).await.unwrap();
        let prompt = ctx.system_prompt.unwrap();
        assert!(prompt.contains("# Active Skill: research"));
        assert!(prompt.contains("Use sources."));
        assert!(prompt.contains("# Skill Pipeline"));
        assert!(prompt.contains("- default next: summarize"));
        assert!(prompt.contains("- if needs code: coding"));
    }

    #[tokio::test]
    async fn skills_summary_when_no_active_skill() {
        let mut state = base_state();
        state.skills = Arc::new(SkillStore::from_skills(vec![Skill::new(
            "research",
            "Research things",
            "...",
        )]));
        let state = Arc::new(state);
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);

        stage.process(&mut ctx).await.unwrap();
        let prompt = ctx.system_prompt.unwrap();
        assert!(prompt.contains("# Available Skills"));
        assert!(prompt.contains("- research: Research things"));
    }

    #[tokio::test]
    async fn plan_mode_advertises_control_tools() {
        let state = Arc::new(base_state());
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);
        ctx.plan_mode_active = true;

        stage.process(&mut ctx).await.unwrap();
        let names: Vec<_> = ctx.available_tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"plan_set_content"));
        assert!(names.contains(&"plan_get"));
        assert!(state.tool_registry.get("plan_get").is_some());
    }

    #[tokio::test]
    async fn auto_mode_sets_tier_and_goals() {
        struct Goals;
        impl crate::ports::AutoModePort for Goals {
            fn goals(&self) -> String {
                "Keep the inbox at zero.".into()
            }
        }

        let mut state = base_state();
        state.auto_mode = Arc::new(Goals);
        let state = Arc::new(state);
        let stage = ContextBuildStage::new(state.clone());
        let auto_msg =
            Message::user("tick").with_metadata(keys::AUTO_MODE, serde_json::json!(true));
        let mut ctx = ctx_for(vec![auto_msg]);

        stage.process(&mut ctx).await.unwrap();
        assert_eq!(ctx.model_tier, Some(ModelTier::Balanced));
        assert!(ctx.system_prompt.unwrap().contains("# Goals\nKeep the inbox"));
    }

    #[tokio::test]
    async fn skill_transition_applied_and_cleared() {
        let mut state = base_state();
        state.skills = Arc::new(SkillStore::from_skills(vec![Skill::new(
            "summarize",
            "Summaries",
            "Summarize tightly.",
        )]));
        let state = Arc::new(state);
        let stage = ContextBuildStage::new(state.clone());
        let mut ctx = ctx_for(vec![Message::user("hi")]);
        ctx.skill_transition = Some("summarize".into());

        stage.process(&mut ctx).await.unwrap();
        assert!(ctx.skill_transition.is_none());
        assert_eq!(ctx.active_skill.as_ref().unwrap().name, "summarize");
    }
}
