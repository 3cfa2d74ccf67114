//! Outbound and inbound ports of the runtime.
//!
//! Everything the core consumes from the outside world (RAG, MCP,
//! confirmations, rate limiting, memory, preferences) and everything
//! the outside world consumes from the core (channel delivery, voice)
//! crosses one of these traits. Each port ships a null/default
//! implementation so partial wirings stay runnable.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use herald_domain::event::RuntimeEvent;
use herald_domain::stream::LlmUsage;
use herald_domain::tool::ToolDefinition;
use herald_domain::{Error, Result};
use herald_sessions::SharedSession;
use herald_skills::Skill;
use herald_tools::ToolComponent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound ports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Retrieval-augmented context for the prompt. When unavailable the
/// context builder skips the query entirely.
#[async_trait::async_trait]
pub trait RagPort: Send + Sync {
    fn is_available(&self) -> bool;
    async fn query(&self, session_id: &str, text: &str) -> Result<String>;
}

/// External tool-server access for skills that carry an `mcp_config`.
#[async_trait::async_trait]
pub trait McpPort: Send + Sync {
    /// Start (or reuse) the client for a skill and list its tools.
    async fn get_or_start_client(&self, skill: &Skill) -> Result<Vec<ToolDefinition>>;

    /// Wrap one advertised tool as an executable component.
    fn create_tool_adapter(
        &self,
        skill_name: &str,
        definition: &ToolDefinition,
    ) -> Arc<dyn ToolComponent>;
}

/// Asks the user to approve a risky tool call. `Ok(false)` is a
/// refusal; the loop records a synthetic policy denial.
#[async_trait::async_trait]
pub trait ConfirmationPort: Send + Sync {
    async fn ask(&self, tool_name: &str, arguments: &Value) -> Result<bool>;
}

/// Write-only usage sink. Failures are the tracker's problem; the
/// loop logs and moves on.
pub trait UsageTrackingPort: Send + Sync {
    fn record_usage(&self, provider_id: &str, model: &str, usage: LlmUsage) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub retry_after: Option<Duration>,
}

/// Consulted once per incoming message, before anything else runs.
pub trait RateLimitPort: Send + Sync {
    fn try_consume(&self) -> RateLimitResult;
}

/// Long-term memory: read back into the prompt, written after each
/// completed exchange.
#[async_trait::async_trait]
pub trait MemoryComponent: Send + Sync {
    /// Rendered memory block for the `# Memory` prompt section. Empty
    /// means the section is omitted.
    fn memory_context(&self) -> String;

    async fn persist_exchange(
        &self,
        session_id: String,
        user_text: String,
        assistant_text: String,
    ) -> Result<()>;
}

/// Localized user-facing strings, keyed by message id.
pub trait PreferencesPort: Send + Sync {
    fn get_message(&self, key: &str) -> String;
}

/// Goal text injected into machine-triggered turns.
pub trait AutoModePort: Send + Sync {
    fn goals(&self) -> String;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound ports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A channel adapter (messaging platform). Response routing selects
/// the adapter whose type matches the session's channel.
#[async_trait::async_trait]
pub trait ChannelPort: Send + Sync {
    fn channel_type(&self) -> &str;

    async fn send_message(&self, chat_id: &str, text: &str, attachments: &[String]) -> Result<()>;

    async fn send_runtime_event(&self, chat_id: &str, event: &RuntimeEvent) -> Result<()>;
}

/// Optional voice delivery alongside (not instead of) text.
#[async_trait::async_trait]
pub trait VoiceResponseHandler: Send + Sync {
    fn is_available(&self) -> bool;

    /// Returns whether voice was actually sent.
    async fn try_send_voice(
        &self,
        session: &SharedSession,
        chat_id: &str,
        text: &str,
    ) -> Result<bool>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Null / default implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct NullRag;

#[async_trait::async_trait]
impl RagPort for NullRag {
    fn is_available(&self) -> bool {
        false
    }

    async fn query(&self, _session_id: &str, _text: &str) -> Result<String> {
        Ok(String::new())
    }
}

pub struct NullMcp;

#[async_trait::async_trait]
impl McpPort for NullMcp {
    async fn get_or_start_client(&self, _skill: &Skill) -> Result<Vec<ToolDefinition>> {
        Ok(Vec::new())
    }

    fn create_tool_adapter(
        &self,
        _skill_name: &str,
        definition: &ToolDefinition,
    ) -> Arc<dyn ToolComponent> {
        Arc::new(UnavailableTool {
            definition: definition.clone(),
        })
    }
}

/// Placeholder adapter for tools whose backing server is gone.
struct UnavailableTool {
    definition: ToolDefinition,
}

#[async_trait::async_trait]
impl ToolComponent for UnavailableTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, _arguments: &Value) -> Result<String> {
        Err(Error::Tool(format!(
            "tool server unavailable: {}",
            self.definition.name
        )))
    }
}

/// Approves every confirmation prompt (headless default).
pub struct AutoApproveConfirmations;

#[async_trait::async_trait]
impl ConfirmationPort for AutoApproveConfirmations {
    async fn ask(&self, _tool_name: &str, _arguments: &Value) -> Result<bool> {
        Ok(true)
    }
}

pub struct NullUsageTracker;

impl UsageTrackingPort for NullUsageTracker {
    fn record_usage(&self, _provider_id: &str, _model: &str, _usage: LlmUsage) -> Result<()> {
        Ok(())
    }
}

pub struct UnlimitedRateLimit;

impl RateLimitPort for UnlimitedRateLimit {
    fn try_consume(&self) -> RateLimitResult {
        RateLimitResult {
            allowed: true,
            retry_after: None,
        }
    }
}

pub struct NullMemory;

#[async_trait::async_trait]
impl MemoryComponent for NullMemory {
    fn memory_context(&self) -> String {
        String::new()
    }

    async fn persist_exchange(
        &self,
        _session_id: String,
        _user_text: String,
        _assistant_text: String,
    ) -> Result<()> {
        Ok(())
    }
}

/// In-memory preference bundle with sane fallbacks for the keys the
/// runtime reads.
pub struct StaticPreferences {
    messages: std::collections::HashMap<String, String>,
}

/// Preference key for the feedback-guarantee fallback reply.
pub const MSG_GENERIC_FEEDBACK: &str = "system.error.generic.feedback";
/// Preference key for the rate-limit rejection reply.
pub const MSG_RATE_LIMITED: &str = "system.error.rate_limited";

impl Default for StaticPreferences {
    fn default() -> Self {
        let mut messages = std::collections::HashMap::new();
        messages.insert(
            MSG_GENERIC_FEEDBACK.to_string(),
            "Something went wrong while handling your message. Please try again.".to_string(),
        );
        messages.insert(
            MSG_RATE_LIMITED.to_string(),
            "You're sending messages too quickly. Please wait a moment.".to_string(),
        );
        Self { messages }
    }
}

impl StaticPreferences {
    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }
}

impl PreferencesPort for StaticPreferences {
    fn get_message(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

pub struct NullAutoMode;

impl AutoModePort for NullAutoMode {
    fn goals(&self) -> String {
        String::new()
    }
}

pub struct NoVoice;

#[async_trait::async_trait]
impl VoiceResponseHandler for NoVoice {
    fn is_available(&self) -> bool {
        false
    }

    async fn try_send_voice(
        &self,
        _session: &SharedSession,
        _chat_id: &str,
        _text: &str,
    ) -> Result<bool> {
        Ok(false)
    }
}

/// Matcher placeholder for wirings without skill routing.
pub struct DisabledMatcher;

#[async_trait::async_trait]
impl herald_skills::SkillMatcherPort for DisabledMatcher {
    fn is_enabled(&self) -> bool {
        false
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn index_skills(&self, _skills: &[Skill]) -> Result<()> {
        Ok(())
    }

    async fn match_skill(
        &self,
        _query: &str,
        _skills: &[Skill],
        _recent: &[herald_domain::Message],
    ) -> Result<herald_skills::SkillMatchResult> {
        Err(Error::Other("matcher disabled".into()))
    }
}
