//! Skills: named prompt fragments with optional pipeline transitions
//! and MCP tool bundles, the in-memory store, the matcher port used
//! by routing, and the templated prompt-section service.

pub mod matcher;
pub mod sections;
pub mod store;
pub mod types;

pub use matcher::{SkillMatchResult, SkillMatcherPort};
pub use sections::{PromptSection, PromptSectionService};
pub use store::SkillStore;
pub use types::Skill;
