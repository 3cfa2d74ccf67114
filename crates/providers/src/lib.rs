//! LLM provider surface: the [`LlmPort`] trait every adapter
//! implements, the provider error taxonomy, the stable error-code
//! classifier, and model-tier selection.

pub mod classifier;
pub mod error;
pub mod selection;
pub mod traits;

pub use error::{LlmError, LlmResult};
pub use selection::{ModelSelection, ModelSelectionService, ModelTier};
pub use traits::{ChatRequest, ChatResponse, LlmPort};
