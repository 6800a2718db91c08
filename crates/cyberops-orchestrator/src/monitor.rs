use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Execution metrics tracked per agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_started: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub duration_ms: u64,
    pub last_task: Option<Uuid>,
}

/// Tracks execution metrics for every agent the scheduler drives.
pub struct AgentMonitor {
    metrics: RwLock<HashMap<Uuid, AgentMetrics>>,
}

impl AgentMonitor {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Start tracking an agent with empty metrics.
    pub fn register(&self, agent_id: Uuid) {
        self.metrics.write().entry(agent_id).or_default();
    }

    pub fn start_task(&self, agent_id: Uuid, task_id: Uuid) {
        let mut metrics = self.metrics.write();
        let entry = metrics.entry(agent_id).or_default();
        entry.tasks_started += 1;
        entry.last_task = Some(task_id);
    }

    pub fn record_completed(&self, agent_id: Uuid, duration_ms: u64) {
        let mut metrics = self.metrics.write();
        let entry = metrics.entry(agent_id).or_default();
        entry.tasks_completed += 1;
        entry.duration_ms += duration_ms;
    }

    pub fn record_failed(&self, agent_id: Uuid, duration_ms: u64) {
        let mut metrics = self.metrics.write();
        let entry = metrics.entry(agent_id).or_default();
        entry.tasks_failed += 1;
        entry.duration_ms += duration_ms;
    }

    pub fn get(&self, agent_id: Uuid) -> Option<AgentMetrics> {
        self.metrics.read().get(&agent_id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<Uuid, AgentMetrics> {
        self.metrics.read().clone()
    }

    /// Sum of metrics across all agents. `last_task` is left empty.
    pub fn aggregate(&self) -> AgentMetrics {
        let metrics = self.metrics.read();
        let mut total = AgentMetrics::default();
        for m in metrics.values() {
            total.tasks_started += m.tasks_started;
            total.tasks_completed += m.tasks_completed;
            total.tasks_failed += m.tasks_failed;
            total.duration_ms += m.duration_ms;
        }
        total
    }

    /// Serialize the current metrics as JSON (for dashboards).
    pub fn to_json(&self) -> serde_json::Value {
        let agents: HashMap<String, AgentMetrics> = self
            .snapshot()
            .into_iter()
            .map(|(id, m)| (id.to_string(), m))
            .collect();
        serde_json::json!({
            "agents": agents,
            "aggregate": self.aggregate(),
        })
    }
}

impl Default for AgentMonitor {
    fn default() -> Self {
        Self::new()
    }
}
