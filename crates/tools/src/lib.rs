//! The tool execution system: the [`ToolComponent`] trait implemented
//! by every tool, the registry the context builder reads, and the
//! executor the tool loop dispatches through.

pub mod executor;
pub mod registry;

pub use executor::{ToolExecutor, ToolExecutorPort};
pub use registry::ToolRegistry;

use herald_domain::tool::ToolDefinition;
use herald_domain::Result;
use serde_json::Value;

/// One executable tool. Static tools are registered at wiring time;
/// MCP-backed tools are adapted into this trait per skill.
#[async_trait::async_trait]
pub trait ToolComponent: Send + Sync {
    /// The definition advertised to the LLM.
    fn definition(&self) -> ToolDefinition;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Risky tools gate execution behind the confirmation port.
    fn requires_confirmation(&self) -> bool {
        false
    }

    async fn execute(&self, arguments: &Value) -> Result<String>;
}
