//! Well-known metadata keys.
//!
//! Message and session metadata are open maps; these constants name
//! the keys the runtime reads and writes.

/// Message metadata flag marking a machine-triggered turn. When the
/// last user message carries `auto.mode = true`, skill routing and the
/// feedback guarantee are skipped and the auto model tier applies.
pub const AUTO_MODE: &str = "auto.mode";

/// Session metadata key tracking the model that drove the previous
/// turn. A mismatch against the freshly resolved model triggers
/// conversation-view flattening.
pub const LLM_MODEL: &str = "llm.model";

/// Tool-outcome metadata flag set when a call was recorded as a plan
/// step instead of being executed.
pub const PLANNED: &str = "planned";
