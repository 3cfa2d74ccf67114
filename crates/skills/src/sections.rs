//! Templated prompt sections.
//!
//! The system prompt opens with a deterministic sequence of named
//! sections rendered in ascending order, with `{{VARIABLE}}`
//! placeholders substituted from per-turn variables.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    pub name: String,
    pub content: String,
    pub order: i32,
    #[serde(default = "d_true")]
    pub enabled: bool,
}

impl PromptSection {
    pub fn new(name: impl Into<String>, content: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            order,
            enabled: true,
        }
    }
}

/// Holds the configured prompt sections and renders them in order.
pub struct PromptSectionService {
    enabled: bool,
    sections: RwLock<Vec<PromptSection>>,
}

impl PromptSectionService {
    pub fn new(sections: Vec<PromptSection>) -> Self {
        Self {
            enabled: true,
            sections: RwLock::new(sections),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            sections: RwLock::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabled sections in ascending `order` (stable for equal orders).
    pub fn sections(&self) -> Vec<PromptSection> {
        let mut out: Vec<PromptSection> = self
            .sections
            .read()
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.order);
        out
    }

    /// Render all enabled sections with the given variables, joined by
    /// blank lines. Empty when disabled or no sections configured.
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        if !self.enabled {
            return String::new();
        }
        self.sections()
            .iter()
            .map(|s| substitute(&s.content, variables))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Replace each `{{KEY}}` placeholder with its variable value.
/// Unknown placeholders are left in place.
pub fn substitute(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in variables {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

fn d_true() -> bool {
    true
}
