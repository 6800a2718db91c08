use crate::tool::ToolDescriptor;
use std::collections::HashMap;
use tracing::{info, warn};

/// Central registry of known tools, indexed by id and by agent type.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    /// Tool ids per agent type, in registration order.
    by_agent_type: HashMap<String, Vec<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            by_agent_type: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in catalog.
    pub fn with_builtin_catalog() -> Self {
        let mut registry = Self::new();
        crate::catalog::register_builtin_catalog(&mut registry);
        registry
    }

    /// Register a tool. Re-registering an id replaces the previous descriptor.
    pub fn register(&mut self, tool: ToolDescriptor) {
        let id = tool.id.clone();
        if self.tools.contains_key(&id) {
            warn!(tool = %id, "Replacing registered tool");
            for ids in self.by_agent_type.values_mut() {
                ids.retain(|t| t != &id);
            }
        }
        for agent_type in &tool.agent_types {
            self.by_agent_type
                .entry(agent_type.clone())
                .or_default()
                .push(id.clone());
        }
        info!(tool = %id, "Registered tool");
        self.tools.insert(id, tool);
    }

    pub fn tool_by_id(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.get(id)
    }

    /// Tools available to an agent type, in registration order.
    pub fn tools_for_agent_type(&self, agent_type: &str) -> Vec<&ToolDescriptor> {
        self.by_agent_type
            .get(agent_type)
            .map(|ids| ids.iter().filter_map(|id| self.tools.get(id)).collect())
            .unwrap_or_default()
    }

    /// Tools tagged with the given ATT&CK technique id.
    pub fn tools_for_technique(&self, technique: &str) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<&ToolDescriptor> = self
            .tools
            .values()
            .filter(|t| t.techniques.iter().any(|x| x == technique))
            .collect();
        tools.sort_by(|a, b| a.id.cmp(&b.id));
        tools
    }

    /// All agent types that have at least one tool.
    pub fn agent_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_agent_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn list_descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<&ToolDescriptor> = self.tools.values().collect();
        tools.sort_by(|a, b| a.id.cmp(&b.id));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
