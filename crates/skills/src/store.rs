use parking_lot::RwLock;

use crate::types::Skill;

/// In-memory skills store.
pub struct SkillStore {
    skills: RwLock<Vec<Skill>>,
}

impl Default for SkillStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl SkillStore {
    pub fn empty() -> Self {
        Self {
            skills: RwLock::new(Vec::new()),
        }
    }

    pub fn from_skills(skills: Vec<Skill>) -> Self {
        tracing::debug!(skills_count = skills.len(), "skill store loaded");
        Self {
            skills: RwLock::new(skills),
        }
    }

    pub fn get(&self, name: &str) -> Option<Skill> {
        self.skills.read().iter().find(|s| s.name == name).cloned()
    }

    /// Skills currently selectable by routing.
    pub fn available(&self) -> Vec<Skill> {
        self.skills
            .read()
            .iter()
            .filter(|s| s.available)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.read().is_empty()
    }

    /// One line per available skill, for prompt injection.
    pub fn summary(&self) -> String {
        self.skills
            .read()
            .iter()
            .filter(|s| s.available)
            .map(|s| s.render_summary_line())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SkillStore {
        let mut blocked = Skill::new("imaging", "Generate images", "...");
        blocked.available = false;
        SkillStore::from_skills(vec![
            Skill::new("research", "Web research and synthesis", "Use sources."),
            blocked,
        ])
    }

    #[test]
    fn get_by_name() {
        let s = store();
        assert_eq!(s.get("research").unwrap().description, "Web research and synthesis");
        assert!(s.get("missing").is_none());
    }

    #[test]
    fn available_filters_blocked() {
        let s = store();
        let names: Vec<_> = s.available().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["research"]);
    }

    #[test]
    fn summary_lists_available_only() {
        let summary = store().summary();
        assert!(summary.contains("- research: Web research and synthesis"));
        assert!(!summary.contains("imaging"));
    }
}
