//! The skill matcher port consumed by the routing stage.

use herald_domain::config::ModelTier;
use herald_domain::message::Message;
use herald_domain::Result;

use crate::types::Skill;

/// The matcher's verdict for one routing query.
#[derive(Debug, Clone)]
pub struct SkillMatchResult {
    /// Name of the selected skill; `None` on a no-match (the tier
    /// still applies).
    pub selected_skill: Option<String>,
    pub confidence: f32,
    pub model_tier: ModelTier,
    pub reason: String,
    /// True when the matcher fell back to an LLM classification pass.
    pub llm_classifier_used: bool,
    pub latency_ms: u64,
}

impl SkillMatchResult {
    /// A no-match verdict with the given tier.
    pub fn no_match(model_tier: ModelTier, reason: impl Into<String>) -> Self {
        Self {
            selected_skill: None,
            confidence: 0.0,
            model_tier,
            reason: reason.into(),
            llm_classifier_used: false,
            latency_ms: 0,
        }
    }
}

/// Classifies a routing query to a skill. Backed externally (embedding
/// index, LLM classifier); the runtime only sees this surface.
#[async_trait::async_trait]
pub trait SkillMatcherPort: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// True once the matcher's index covers the current skill set.
    fn is_ready(&self) -> bool;

    async fn index_skills(&self, skills: &[Skill]) -> Result<()>;

    async fn match_skill(
        &self,
        query: &str,
        skills: &[Skill],
        recent: &[Message],
    ) -> Result<SkillMatchResult>;
}
