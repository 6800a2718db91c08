use crate::agent::Agent;
use crate::executors::{executor_for, RECONNAISSANCE, THREAT_INTEL, VULNERABILITY};
use crate::policy::PolicyKind;
use crate::scheduler::TaskScheduler;
use cyberops_core::{CyberopsError, CyberopsResult};
use cyberops_oracle::{OracleClient, OracleConfig};
use cyberops_tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Top-level `cyberops.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Agent pool. Empty means one agent per built-in type.
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    /// Simulated processing time awaited by executors, in milliseconds.
    #[serde(default)]
    pub processing_delay_ms: u64,
}

/// One `[[agents]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: Option<String>,
    pub agent_type: String,
    /// Empty means every task the executor handles.
    #[serde(default)]
    pub supported_tasks: Vec<String>,
    #[serde(default = "default_count")]
    pub count: usize,
}

impl AgentConfig {
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            name: None,
            agent_type: agent_type.into(),
            supported_tasks: Vec::new(),
            count: default_count(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_count() -> usize {
    1
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            scheduler: SchedulerConfig::default(),
            agents: Vec::new(),
            data_dir: default_data_dir(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> CyberopsResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| CyberopsError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> CyberopsResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CyberopsError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Fill an empty `oracle.api_key` from the provider's environment variable.
    pub fn apply_env(&mut self) {
        if self.oracle.api_key.is_empty() {
            if let Ok(key) = std::env::var(self.oracle.api_key_env()) {
                self.oracle.api_key = key;
            }
        }
    }

    pub fn validate(&self) -> CyberopsResult<()> {
        for agent in &self.agents {
            let executor = executor_for(&agent.agent_type).ok_or_else(|| {
                CyberopsError::Config(format!("unknown agent type '{}'", agent.agent_type))
            })?;
            if agent.count == 0 {
                return Err(CyberopsError::Config(format!(
                    "agent '{}' has count 0",
                    agent.name.as_deref().unwrap_or(&agent.agent_type)
                )));
            }
            for task in &agent.supported_tasks {
                if !executor.handled_tasks().contains(&task.as_str()) {
                    warn!(
                        agent_type = %agent.agent_type,
                        task = %task,
                        "Advertised task has no handler and will fail when run"
                    );
                }
            }
        }
        Ok(())
    }

    /// Configured agent entries, or one default entry per built-in type.
    pub fn effective_agents(&self) -> Vec<AgentConfig> {
        if self.agents.is_empty() {
            [RECONNAISSANCE, VULNERABILITY, THREAT_INTEL]
                .into_iter()
                .map(AgentConfig::new)
                .collect()
        } else {
            self.agents.clone()
        }
    }

    /// Instantiate the agent pool.
    pub fn build_agents(
        &self,
        oracle: Arc<OracleClient>,
        tools: Arc<ToolRegistry>,
    ) -> CyberopsResult<Vec<Arc<Agent>>> {
        let delay = Duration::from_millis(self.scheduler.processing_delay_ms);
        let mut agents = Vec::new();
        for entry in self.effective_agents() {
            let executor = executor_for(&entry.agent_type).ok_or_else(|| {
                CyberopsError::Config(format!("unknown agent type '{}'", entry.agent_type))
            })?;
            let supported: Vec<String> = if entry.supported_tasks.is_empty() {
                executor.handled_tasks().iter().map(ToString::to_string).collect()
            } else {
                entry.supported_tasks.clone()
            };
            for i in 0..entry.count {
                let mut agent = Agent::new(
                    entry.agent_type.clone(),
                    supported.clone(),
                    Arc::clone(&executor),
                    Arc::clone(&oracle),
                )
                .with_tools(Arc::clone(&tools))
                .with_processing_delay(delay);
                if let Some(name) = &entry.name {
                    agent = if entry.count > 1 {
                        agent.with_name(format!("{name}-{}", i + 1))
                    } else {
                        agent.with_name(name.clone())
                    };
                }
                agents.push(Arc::new(agent));
            }
        }
        Ok(agents)
    }

    /// Scheduler with the configured policy and the agent pool registered.
    pub fn build_scheduler(
        &self,
        oracle: Arc<OracleClient>,
        tools: Arc<ToolRegistry>,
    ) -> CyberopsResult<Arc<TaskScheduler>> {
        let scheduler = TaskScheduler::with_policy(self.scheduler.policy.build());
        for agent in self.build_agents(oracle, tools)? {
            scheduler.register_agent(agent);
        }
        info!(
            policy = scheduler.policy_name(),
            agents = scheduler.agents().len(),
            "Scheduler ready"
        );
        Ok(Arc::new(scheduler))
    }
}
