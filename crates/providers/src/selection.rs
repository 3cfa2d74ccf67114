//! Model-tier resolution.
//!
//! Skill routing and auto mode hand the runtime a symbolic
//! [`ModelTier`]; this service resolves it to a concrete model name
//! and reasoning effort.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use herald_domain::config::ModelTier;

/// A resolved model choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl ModelSelection {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reasoning_effort: None,
        }
    }

    pub fn with_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }
}

/// Tier → model mapping with a default fallback.
pub struct ModelSelectionService {
    default: ModelSelection,
    tiers: HashMap<ModelTier, ModelSelection>,
}

impl ModelSelectionService {
    pub fn new(default: ModelSelection) -> Self {
        Self {
            default,
            tiers: HashMap::new(),
        }
    }

    pub fn with_tier(mut self, tier: ModelTier, selection: ModelSelection) -> Self {
        self.tiers.insert(tier, selection);
        self
    }

    /// Resolve a tier to its configured selection; an unmapped or
    /// missing tier falls back to the default.
    pub fn resolve(&self, tier: Option<ModelTier>) -> ModelSelection {
        tier.and_then(|t| self.tiers.get(&t))
            .unwrap_or(&self.default)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_configured_tier() {
        let svc = ModelSelectionService::new(ModelSelection::new("default-model")).with_tier(
            ModelTier::Coding,
            ModelSelection::new("coder-xl").with_effort("high"),
        );

        let coding = svc.resolve(Some(ModelTier::Coding));
        assert_eq!(coding.model, "coder-xl");
        assert_eq!(coding.reasoning_effort.as_deref(), Some("high"));

        assert_eq!(svc.resolve(Some(ModelTier::Fast)).model, "default-model");
        assert_eq!(svc.resolve(None).model, "default-model");
    }
}
