use crate::executors::TaskExecutor;
use crate::types::{
    AgentStatus, ChainOfThought, CyberEvent, Severity, Task, ThoughtKind, ToolExecution,
};
use chrono::Utc;
use cyberops_core::{CyberopsError, CyberopsResult};
use cyberops_oracle::{FileReference, OracleClient};
use cyberops_tools::{ToolDescriptor, ToolRegistry};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handler for events emitted by an agent.
pub type EventCallback = Arc<dyn Fn(&CyberEvent) + Send + Sync>;
/// Handler for chain-of-thought steps.
pub type ThoughtCallback = Arc<dyn Fn(&ChainOfThought) + Send + Sync>;
/// Handler for agent status changes: `(agent_id, new_status)`.
pub type StatusCallback = Arc<dyn Fn(Uuid, AgentStatus) + Send + Sync>;

struct AgentState {
    status: AgentStatus,
    current_task: Option<Uuid>,
}

/// Serializable view of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: Uuid,
    pub name: String,
    pub agent_type: String,
    pub supported_tasks: Vec<String>,
    pub status: AgentStatus,
    pub current_task: Option<Uuid>,
}

/// A long-lived worker bound to one agent type and a fixed list of task names.
///
/// The concrete work is delegated to a [`TaskExecutor`]; the agent owns the
/// status machine, the audit logs and the callback slots.
pub struct Agent {
    id: Uuid,
    name: String,
    agent_type: String,
    supported_tasks: Vec<String>,
    state: Mutex<AgentState>,
    executor: Arc<dyn TaskExecutor>,
    oracle: Arc<OracleClient>,
    tools: Arc<ToolRegistry>,
    processing_delay: Duration,
    thoughts: Mutex<Vec<ChainOfThought>>,
    tool_log: Mutex<Vec<ToolExecution>>,
    on_event: RwLock<Option<EventCallback>>,
    on_thought: RwLock<Option<ThoughtCallback>>,
    on_status: RwLock<Option<StatusCallback>>,
}

impl Agent {
    /// Create an idle agent. The name defaults to `<agent_type>-<short id>`.
    pub fn new(
        agent_type: impl Into<String>,
        supported_tasks: Vec<String>,
        executor: Arc<dyn TaskExecutor>,
        oracle: Arc<OracleClient>,
    ) -> Self {
        let id = Uuid::new_v4();
        let agent_type = agent_type.into();
        let short = id.simple().to_string();
        Self {
            id,
            name: format!("{agent_type}-{}", &short[..8]),
            agent_type,
            supported_tasks,
            state: Mutex::new(AgentState {
                status: AgentStatus::Idle,
                current_task: None,
            }),
            executor,
            oracle,
            tools: Arc::new(ToolRegistry::new()),
            processing_delay: Duration::ZERO,
            thoughts: Mutex::new(Vec::new()),
            tool_log: Mutex::new(Vec::new()),
            on_event: RwLock::new(None),
            on_thought: RwLock::new(None),
            on_status: RwLock::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Simulated processing time awaited by executors between stages.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn supported_tasks(&self) -> &[String] {
        &self.supported_tasks
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    pub fn current_task(&self) -> Option<Uuid> {
        self.state.lock().current_task
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Snapshot of identity, capabilities and current status.
    pub fn info(&self) -> AgentInfo {
        let state = self.state.lock();
        AgentInfo {
            id: self.id,
            name: self.name.clone(),
            agent_type: self.agent_type.clone(),
            supported_tasks: self.supported_tasks.clone(),
            status: state.status,
            current_task: state.current_task,
        }
    }

    pub fn can_handle_task(&self, task_name: &str) -> bool {
        self.supported_tasks.iter().any(|t| t == task_name)
    }

    /// Execute a task and return its terminal event.
    ///
    /// The agent is `Busy` for the duration. On exit it returns to `Idle`,
    /// except after an agent fault (see `CyberopsError::is_agent_fault`),
    /// which leaves it in `Error` until [`restart`](Self::restart).
    pub async fn execute_task(&self, task: &Task) -> CyberopsResult<CyberEvent> {
        self.claim(task.id)?;
        info!(
            agent = %self.name,
            task = %task.task_id,
            task_name = %task.task_name,
            "Agent executing task"
        );

        let result = self.executor.execute(self, task).await;
        self.release(task.id, result.as_ref().err());
        result
    }

    /// Mark the agent busy for `task_id` without firing the status callback.
    /// Returns false unless the agent was idle.
    pub(crate) fn try_reserve(&self, task_id: Uuid) -> bool {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Idle {
            return false;
        }
        state.status = AgentStatus::Busy;
        state.current_task = Some(task_id);
        true
    }

    /// Undo a reservation that never reached execution.
    pub(crate) fn cancel_reservation(&self, task_id: Uuid) {
        let mut state = self.state.lock();
        if state.current_task == Some(task_id) {
            state.current_task = None;
            if state.status == AgentStatus::Busy {
                state.status = AgentStatus::Idle;
            }
        }
    }

    /// Fire the status callback with the current status.
    pub(crate) fn announce_status(&self) {
        let status = self.status();
        self.notify_status(status);
    }

    fn claim(&self, task_id: Uuid) -> CyberopsResult<()> {
        let changed = {
            let mut state = self.state.lock();
            match (state.status, state.current_task) {
                // Already reserved for this task by the scheduler.
                (AgentStatus::Busy, Some(current)) if current == task_id => false,
                (AgentStatus::Idle, _) => {
                    state.status = AgentStatus::Busy;
                    state.current_task = Some(task_id);
                    true
                }
                (status, current) => {
                    // Drop a reservation that was overtaken by stop().
                    if current == Some(task_id) {
                        state.current_task = None;
                    }
                    return Err(CyberopsError::AgentUnavailable(format!(
                        "agent '{}' is {status}",
                        self.name
                    )));
                }
            }
        };
        if changed {
            self.notify_status(AgentStatus::Busy);
        }
        Ok(())
    }

    fn release(&self, task_id: Uuid, error: Option<&CyberopsError>) {
        let next = {
            let mut state = self.state.lock();
            if state.current_task == Some(task_id) {
                state.current_task = None;
            }
            // Stopped while busy: stay offline.
            if state.status != AgentStatus::Busy {
                return;
            }
            state.status = match error {
                Some(e) if e.is_agent_fault() => AgentStatus::Error,
                _ => AgentStatus::Idle,
            };
            state.status
        };
        if let Some(e) = error {
            warn!(agent = %self.name, error = %e, status = %next, "Task execution failed");
        }
        self.notify_status(next);
    }

    /// Bring the agent online. A task still running keeps the agent busy.
    pub fn start(&self) {
        let next = {
            let mut state = self.state.lock();
            let next = if state.current_task.is_some() {
                AgentStatus::Busy
            } else {
                AgentStatus::Idle
            };
            if state.status == next {
                return;
            }
            state.status = next;
            next
        };
        self.notify_status(next);
    }

    /// Take the agent offline. A running task finishes, but the agent stays offline.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.status == AgentStatus::Offline {
                return;
            }
            state.status = AgentStatus::Offline;
        }
        self.notify_status(AgentStatus::Offline);
    }

    /// Clear a sticky `Error`. Returns false if the agent was not in `Error`.
    pub fn restart(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.status != AgentStatus::Error {
                return false;
            }
            state.status = AgentStatus::Idle;
            state.current_task = None;
        }
        info!(agent = %self.name, "Agent restarted");
        self.notify_status(AgentStatus::Idle);
        true
    }

    fn notify_status(&self, status: AgentStatus) {
        debug!(agent = %self.name, status = %status, "Agent status changed");
        let callback = self.on_status.read().clone();
        if let Some(cb) = callback {
            cb(self.id, status);
        }
    }

    // --- Audit emission ---

    /// Record a chain-of-thought step and hand it to the registered callback.
    ///
    /// Step numbers are taken as given; callers keep them increasing per task.
    #[allow(clippy::too_many_arguments)]
    pub fn log_chain_of_thought(
        &self,
        step: u32,
        kind: ThoughtKind,
        description: impl Into<String>,
        reasoning: impl Into<String>,
        data: Option<serde_json::Value>,
        confidence: Option<f64>,
        task_id: Option<Uuid>,
    ) -> ChainOfThought {
        let thought = ChainOfThought {
            step,
            kind,
            description: description.into(),
            reasoning: reasoning.into(),
            data,
            confidence: confidence.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0)),
            timestamp: Utc::now(),
            agent_id: self.id,
            task_id,
        };
        self.thoughts.lock().push(thought.clone());

        let callback = self.on_thought.read().clone();
        if let Some(cb) = callback {
            cb(&thought);
        }
        thought
    }

    /// Build an event and hand it to the registered callback. Severity defaults to `Info`.
    pub fn emit_event(
        &self,
        kind: impl Into<String>,
        payload: serde_json::Value,
        severity: Option<Severity>,
        target: Option<&str>,
        task_id: Option<Uuid>,
    ) -> CyberEvent {
        let event = CyberEvent {
            id: Uuid::new_v4(),
            kind: kind.into(),
            severity: severity.unwrap_or(Severity::Info),
            payload,
            target: target.map(str::to_string),
            processed: false,
            timestamp: Utc::now(),
            agent_id: self.id,
            task_id,
        };
        info!(
            agent = %self.name,
            kind = %event.kind,
            severity = %event.severity,
            "Event emitted"
        );

        let callback = self.on_event.read().clone();
        if let Some(cb) = callback {
            cb(&event);
        }
        event
    }

    /// Append a tool usage record. The tool is never actually run.
    pub fn log_tool_usage(
        &self,
        tool_id: impl Into<String>,
        command: impl Into<String>,
        target: impl Into<String>,
        options: Option<serde_json::Value>,
        task_id: Option<Uuid>,
    ) -> ToolExecution {
        let record = ToolExecution {
            id: Uuid::new_v4(),
            tool_id: tool_id.into(),
            command: command.into(),
            target: target.into(),
            options: options.unwrap_or_else(|| serde_json::json!({})),
            started_at: Utc::now(),
            completed_at: None,
            exit_code: None,
            output: None,
            task_id,
        };
        debug!(agent = %self.name, tool = %record.tool_id, command = %record.command, "Tool usage recorded");
        self.tool_log.lock().push(record.clone());
        record
    }

    /// Fill the completion fields of one tool record. A record completes once.
    pub fn complete_tool_execution(
        &self,
        execution_id: Uuid,
        exit_code: i32,
        output: impl Into<String>,
    ) -> CyberopsResult<ToolExecution> {
        let mut log = self.tool_log.lock();
        let record = log
            .iter_mut()
            .find(|r| r.id == execution_id)
            .ok_or_else(|| {
                CyberopsError::ToolExecution(format!("unknown tool execution {execution_id}"))
            })?;
        if record.is_complete() {
            return Err(CyberopsError::ToolExecution(format!(
                "tool execution {execution_id} already completed"
            )));
        }
        record.completed_at = Some(Utc::now());
        record.exit_code = Some(exit_code);
        record.output = Some(output.into());
        Ok(record.clone())
    }

    pub fn tool_executions(&self) -> Vec<ToolExecution> {
        self.tool_log.lock().clone()
    }

    pub fn thoughts(&self) -> Vec<ChainOfThought> {
        self.thoughts.lock().clone()
    }

    // --- Callback slots (single handler; registering replaces) ---

    pub fn set_event_callback(&self, callback: EventCallback) {
        *self.on_event.write() = Some(callback);
    }

    pub fn clear_event_callback(&self) {
        *self.on_event.write() = None;
    }

    pub fn set_chain_of_thought_callback(&self, callback: ThoughtCallback) {
        *self.on_thought.write() = Some(callback);
    }

    pub fn clear_chain_of_thought_callback(&self) {
        *self.on_thought.write() = None;
    }

    pub fn set_status_change_callback(&self, callback: StatusCallback) {
        *self.on_status.write() = Some(callback);
    }

    pub fn clear_status_change_callback(&self) {
        *self.on_status.write() = None;
    }

    // --- Decision Oracle ---

    /// Ask the oracle and parse its answer as JSON.
    pub async fn decide(&self, prompt: &str) -> CyberopsResult<serde_json::Value> {
        debug!(agent = %self.name, prompt_len = prompt.len(), "Consulting decision oracle");
        self.oracle.decide(prompt).await
    }

    /// Like [`decide`](Self::decide), with file references for extra context.
    pub async fn decide_with_files(
        &self,
        prompt: &str,
        files: &[FileReference],
    ) -> CyberopsResult<serde_json::Value> {
        self.oracle.decide_with_files(prompt, files).await
    }

    /// Tools the registry lists for this agent's type.
    pub fn recommended_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .tools_for_agent_type(&self.agent_type)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Await the configured processing delay.
    pub async fn pause(&self) {
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agent_type", &self.agent_type)
            .field("status", &self.status())
            .finish()
    }
}
