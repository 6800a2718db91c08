use cyberops_core::RiskLevel;
use serde::{Deserialize, Serialize};

/// Broad family a tool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Discovery,
    Enumeration,
    VulnerabilityScanning,
    Exploitation,
    ThreatIntelligence,
    Forensics,
}

/// Metadata describing a security tool and which agent types may use it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub risk_level: RiskLevel,
    /// MITRE ATT&CK technique ids associated with the tool.
    #[serde(default)]
    pub techniques: Vec<String>,
    /// Agent types allowed to draw on this tool.
    pub agent_types: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category,
            risk_level,
            techniques: Vec::new(),
            agent_types: Vec::new(),
        }
    }

    pub fn with_techniques(mut self, techniques: &[&str]) -> Self {
        self.techniques = techniques.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn for_agent_types(mut self, agent_types: &[&str]) -> Self {
        self.agent_types = agent_types.iter().map(|t| (*t).to_string()).collect();
        self
    }
}
