use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A skill: a named prompt fragment selected by routing, with
/// optional pipeline transitions and an MCP tool-server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Prompt fragment injected as the active-skill section.
    pub content: String,
    #[serde(default = "d_true")]
    pub available: bool,
    /// Default follow-up skill in a pipeline.
    #[serde(default)]
    pub next_skill: Option<String>,
    /// Condition → skill transitions (rendered into the prompt).
    #[serde(default)]
    pub conditional_next_skills: BTreeMap<String, String>,
    /// MCP server config; presence means the skill brings its own
    /// tool bundle.
    #[serde(default)]
    pub mcp_config: Option<Value>,
}

impl Skill {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            content: content.into(),
            available: true,
            next_skill: None,
            conditional_next_skills: BTreeMap::new(),
            mcp_config: None,
        }
    }

    pub fn render_summary_line(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }

    /// True when the skill declares any pipeline transition.
    pub fn has_pipeline(&self) -> bool {
        self.next_skill.is_some() || !self.conditional_next_skills.is_empty()
    }
}

fn d_true() -> bool {
    true
}
