use chrono::{DateTime, Utc};
use cyberops_core::{CyberopsError, CyberopsResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority given to tasks created without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Lifecycle of a task. The only legal path is
/// `Pending → Assigned → Executing → (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Executing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Assigned)
                | (TaskStatus::Assigned, TaskStatus::Executing)
                | (TaskStatus::Executing, TaskStatus::Completed)
                | (TaskStatus::Executing, TaskStatus::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Assigned => write!(f, "assigned"),
            TaskStatus::Executing => write!(f, "executing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of work requested from a given agent type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Human-readable identifier, e.g. `TASK-0007`.
    pub task_id: String,
    pub agent_type: String,
    pub task_name: String,
    pub target: Option<String>,
    pub details: Option<serde_json::Value>,
    /// Higher is more urgent.
    pub priority: i32,
    pub status: TaskStatus,
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure reason, set when the task ends `Failed`.
    #[serde(default)]
    pub error: Option<String>,
}

impl Task {
    pub fn new(
        task_id: impl Into<String>,
        agent_type: impl Into<String>,
        task_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            agent_type: agent_type.into(),
            task_name: task_name.into(),
            target: None,
            details: None,
            priority: DEFAULT_PRIORITY,
            status: TaskStatus::Pending,
            agent_id: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Move the task one step along its lifecycle and stamp the matching timestamp.
    pub fn transition(&mut self, next: TaskStatus) -> CyberopsResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CyberopsError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        let now = Utc::now();
        match next {
            TaskStatus::Assigned => self.assigned_at = Some(now),
            TaskStatus::Executing => self.started_at = Some(now),
            TaskStatus::Completed | TaskStatus::Failed => self.completed_at = Some(now),
            TaskStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Target label used in prompts and events.
    pub fn target_label(&self) -> &str {
        self.target.as_deref().unwrap_or("unspecified target")
    }
}

/// Status of a worker agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
    /// Sticky fault state; only an explicit restart returns the agent to `Idle`.
    Error,
    Offline,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Error => write!(f, "error"),
            AgentStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Per-status agent tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusCounts {
    pub idle: usize,
    pub busy: usize,
    pub error: usize,
    pub offline: usize,
}

impl AgentStatusCounts {
    pub fn add(&mut self, status: AgentStatus) {
        match status {
            AgentStatus::Idle => self.idle += 1,
            AgentStatus::Busy => self.busy += 1,
            AgentStatus::Error => self.error += 1,
            AgentStatus::Offline => self.offline += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.idle + self.busy + self.error + self.offline
    }
}

/// Stage of reasoning a chain-of-thought step describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtKind {
    Analysis,
    Decision,
    Action,
    Evaluation,
}

/// One immutable step of an agent's reasoning while executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOfThought {
    /// Strictly increasing within one task execution.
    pub step: u32,
    pub kind: ThoughtKind,
    pub description: String,
    pub reasoning: String,
    pub data: Option<serde_json::Value>,
    /// In `[0, 1]`.
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub agent_id: Uuid,
    pub task_id: Option<Uuid>,
}

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lenient parse of oracle-provided labels; unknown labels map to `Medium`.
    pub fn parse_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" | "none" => Severity::Info,
            "low" => Severity::Low,
            "medium" | "moderate" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome an agent reports for a task (terminal) or while monitoring (intermediate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyberEvent {
    pub id: Uuid,
    pub kind: String,
    pub severity: Severity,
    pub payload: serde_json::Value,
    pub target: Option<String>,
    pub processed: bool,
    pub timestamp: DateTime<Utc>,
    pub agent_id: Uuid,
    pub task_id: Option<Uuid>,
}

/// Audit record of a simulated tool invocation. Nothing is actually executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: Uuid,
    pub tool_id: String,
    pub command: String,
    pub target: String,
    pub options: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub task_id: Option<Uuid>,
}

impl ToolExecution {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}
