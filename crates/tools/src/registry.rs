use std::sync::Arc;

use parking_lot::RwLock;

use herald_domain::tool::ToolDefinition;

use crate::ToolComponent;

/// Name-addressable tool registry. Registration order is preserved so
/// advertised definitions stay deterministic.
pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<dyn ToolComponent>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Register a tool. A later registration with the same name
    /// replaces the earlier one (MCP adapters re-register on skill
    /// activation).
    pub fn register(&self, tool: Arc<dyn ToolComponent>) {
        let name = tool.definition().name;
        let mut tools = self.tools.write();
        if let Some(existing) = tools
            .iter_mut()
            .find(|t| t.definition().name == name)
        {
            *existing = tool;
        } else {
            tools.push(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolComponent>> {
        self.tools
            .read()
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    /// Definitions of all enabled tools, in registration order.
    pub fn enabled_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .iter()
            .filter(|t| t.is_enabled())
            .map(|t| t.definition())
            .collect()
    }
}
