use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model tiers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Symbolic model category. Skill routing and auto mode hand the
/// runtime a tier; the selection service resolves it to a concrete
/// model name and reasoning effort per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Balanced,
    Coding,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Balanced => write!(f, "balanced"),
            ModelTier::Coding => write!(f, "coding"),
        }
    }
}

impl FromStr for ModelTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(ModelTier::Fast),
            "balanced" => Ok(ModelTier::Balanced),
            "coding" => Ok(ModelTier::Coding),
            _ => Err(()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runtime
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Top-level runtime configuration for the turn pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum LLM⇄tool iterations inside one turn before the loop
    /// force-stops with a TOOL_LIMIT outcome.
    #[serde(default = "d_10")]
    pub max_iterations: usize,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub auto: AutoConfig,
    #[serde(default)]
    pub plan: PlanConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            routing: RoutingConfig::default(),
            auto: AutoConfig::default(),
            plan: PlanConfig::default(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Skill routing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Skill routing bounds. The matcher call is cut off at `timeout_ms`;
/// the fragmentation analyzer flags bursts of short messages inside
/// the time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "d_1500")]
    pub timeout_ms: u64,
    /// Window (seconds) within which short messages count as fragments.
    #[serde(default = "d_90")]
    pub fragment_window_secs: i64,
    /// Messages at or under this length are fragmentation candidates.
    #[serde(default = "d_24")]
    pub fragment_max_len: usize,
    /// Minimum short messages in the window before the turn is
    /// flagged as fragmented.
    #[serde(default = "d_2")]
    pub fragment_min_signals: usize,
    /// Number of recent user messages aggregated into the routing query.
    #[serde(default = "d_3")]
    pub query_depth: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1500,
            fragment_window_secs: 90,
            fragment_max_len: 24,
            fragment_min_signals: 2,
            query_depth: 3,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auto mode / plan mode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Machine-triggered turns use a fixed model tier and skip routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoConfig {
    #[serde(default = "d_balanced")]
    pub model_tier: ModelTier,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            model_tier: ModelTier::Balanced,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanConfig {
    /// Feature flag for the plan-mode branch and its finalization stage.
    #[serde(default)]
    pub enabled: bool,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_10() -> usize {
    10
}

fn d_1500() -> u64 {
    1500
}

fn d_90() -> i64 {
    90
}

fn d_24() -> usize {
    24
}

fn d_2() -> usize {
    2
}

fn d_3() -> usize {
    3
}

fn d_balanced() -> ModelTier {
    ModelTier::Balanced
}
