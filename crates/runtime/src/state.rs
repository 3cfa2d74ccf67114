//! Shared runtime state handed to every stage.
//!
//! Wiring builds one [`RuntimeState`], customizes the ports it cares
//! about, and wraps it in an `Arc`. Every port has a null default so a
//! minimal wiring (an LLM and a channel) is already a working agent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use herald_domain::config::RuntimeConfig;
use herald_domain::event::PlanReadyEvent;
use herald_providers::{LlmPort, ModelSelection, ModelSelectionService};
use herald_sessions::{HistoryWriter, SessionLockMap, SessionStore};
use herald_skills::{PromptSectionService, SkillMatcherPort, SkillStore};
use herald_tools::{ToolExecutor, ToolExecutorPort, ToolRegistry};

use crate::cancel::CancelMap;
use crate::plan::PlanService;
use crate::ports::{
    AutoApproveConfirmations, AutoModePort, ChannelPort, ConfirmationPort, DisabledMatcher,
    McpPort, MemoryComponent, NoVoice, NullAutoMode, NullMcp, NullMemory, NullRag,
    NullUsageTracker, PreferencesPort, RagPort, RateLimitPort, StaticPreferences,
    UnlimitedRateLimit, UsageTrackingPort, VoiceResponseHandler,
};

pub struct RuntimeState {
    pub config: RuntimeConfig,

    // ── Core services ──────────────────────────────────────────────
    pub llm: Arc<dyn LlmPort>,
    pub model_selection: Arc<ModelSelectionService>,
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,
    pub history: Arc<HistoryWriter>,
    pub skills: Arc<SkillStore>,
    pub skill_matcher: Arc<dyn SkillMatcherPort>,
    pub sections: Arc<PromptSectionService>,
    pub tool_registry: Arc<ToolRegistry>,
    pub tool_executor: Arc<dyn ToolExecutorPort>,
    pub plan: Arc<PlanService>,
    pub cancels: Arc<CancelMap>,

    // ── Outbound ports ─────────────────────────────────────────────
    pub memory: Arc<dyn MemoryComponent>,
    pub rag: Arc<dyn RagPort>,
    pub mcp: Arc<dyn McpPort>,
    pub confirmations: Arc<dyn ConfirmationPort>,
    pub usage: Arc<dyn UsageTrackingPort>,
    pub rate_limit: Arc<dyn RateLimitPort>,
    pub preferences: Arc<dyn PreferencesPort>,
    pub auto_mode: Arc<dyn AutoModePort>,

    // ── Inbound ports ──────────────────────────────────────────────
    pub channels: HashMap<String, Arc<dyn ChannelPort>>,
    pub voice: Arc<dyn VoiceResponseHandler>,

    /// Plan-ready events for whatever approval surface is attached.
    pub plan_events: mpsc::UnboundedSender<PlanReadyEvent>,
}

impl RuntimeState {
    /// Build a state with null ports everywhere except the LLM.
    /// Returns the receiving end of the plan-ready channel.
    pub fn new(
        config: RuntimeConfig,
        llm: Arc<dyn LlmPort>,
    ) -> (Self, mpsc::UnboundedReceiver<PlanReadyEvent>) {
        let (plan_tx, plan_rx) = mpsc::unbounded_channel();
        let tool_registry = Arc::new(ToolRegistry::new());
        let plan_enabled = config.plan.enabled;
        let state = Self {
            config,
            llm,
            model_selection: Arc::new(ModelSelectionService::new(ModelSelection::new(
                "default-model",
            ))),
            sessions: Arc::new(SessionStore::new()),
            session_locks: Arc::new(SessionLockMap::new()),
            history: Arc::new(HistoryWriter::new()),
            skills: Arc::new(SkillStore::empty()),
            skill_matcher: Arc::new(DisabledMatcher),
            sections: Arc::new(PromptSectionService::new(Vec::new())),
            tool_registry: tool_registry.clone(),
            tool_executor: Arc::new(ToolExecutor::new(tool_registry)),
            plan: Arc::new(PlanService::new(plan_enabled)),
            cancels: Arc::new(CancelMap::new()),
            memory: Arc::new(NullMemory),
            rag: Arc::new(NullRag),
            mcp: Arc::new(NullMcp),
            confirmations: Arc::new(AutoApproveConfirmations),
            usage: Arc::new(NullUsageTracker),
            rate_limit: Arc::new(UnlimitedRateLimit),
            preferences: Arc::new(StaticPreferences::default()),
            auto_mode: Arc::new(NullAutoMode),
            channels: HashMap::new(),
            voice: Arc::new(NoVoice),
            plan_events: plan_tx,
        };
        (state, plan_rx)
    }

    /// Register a channel adapter under its own channel type.
    pub fn register_channel(&mut self, channel: Arc<dyn ChannelPort>) {
        self.channels
            .insert(channel.channel_type().to_owned(), channel);
    }

    pub fn channel_for(&self, channel_type: &str) -> Option<Arc<dyn ChannelPort>> {
        self.channels.get(channel_type).cloned()
    }
}
