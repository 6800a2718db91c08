//! Concrete task logic, one executor per agent type.
//!
//! An executor maps task names to handlers. Every handler follows the same
//! emission protocol: numbered chain-of-thought steps, a tool usage record,
//! one or more oracle consultations, and exactly one terminal event on
//! success. Nothing is emitted after a failure.

mod recon;
mod threat_intel;
mod vulnerability;

pub use recon::ReconExecutor;
pub use threat_intel::ThreatIntelExecutor;
pub use vulnerability::VulnerabilityExecutor;

use crate::agent::Agent;
use crate::types::{ChainOfThought, CyberEvent, Severity, Task, ThoughtKind};
use async_trait::async_trait;
use cyberops_core::{CyberopsError, CyberopsResult};
use cyberops_oracle::{decision_as, FileReference};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Agent type served by [`ReconExecutor`].
pub const RECONNAISSANCE: &str = "reconnaissance";
/// Agent type served by [`VulnerabilityExecutor`].
pub const VULNERABILITY: &str = "vulnerability";
/// Agent type served by [`ThreatIntelExecutor`].
pub const THREAT_INTEL: &str = "threat_intel";

/// The task logic behind an agent type.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn agent_type(&self) -> &str;

    /// Task names this executor has handlers for.
    fn handled_tasks(&self) -> &[&'static str];

    /// Run the task on behalf of `agent`, returning the terminal event.
    ///
    /// Unknown task names fail with `CyberopsError::UnsupportedTask`.
    async fn execute(&self, agent: &Agent, task: &Task) -> CyberopsResult<CyberEvent>;
}

/// Built-in executor for an agent type, if any.
pub fn executor_for(agent_type: &str) -> Option<Arc<dyn TaskExecutor>> {
    match agent_type {
        RECONNAISSANCE => Some(Arc::new(ReconExecutor)),
        VULNERABILITY => Some(Arc::new(VulnerabilityExecutor)),
        THREAT_INTEL => Some(Arc::new(ThreatIntelExecutor)),
        _ => None,
    }
}

pub(crate) fn unsupported(agent_type: &str, task: &Task) -> CyberopsError {
    CyberopsError::UnsupportedTask {
        agent_type: agent_type.to_string(),
        task_name: task.task_name.clone(),
    }
}

/// Hands out increasing step numbers for one task execution.
pub struct ThoughtRecorder<'a> {
    agent: &'a Agent,
    task_id: Uuid,
    next_step: u32,
}

impl<'a> ThoughtRecorder<'a> {
    pub fn new(agent: &'a Agent, task: &Task) -> Self {
        Self {
            agent,
            task_id: task.id,
            next_step: 1,
        }
    }

    pub fn record(
        &mut self,
        kind: ThoughtKind,
        description: impl Into<String>,
        reasoning: impl Into<String>,
        data: Option<serde_json::Value>,
        confidence: Option<f64>,
    ) -> ChainOfThought {
        let step = self.next_step;
        self.next_step += 1;
        self.agent.log_chain_of_thought(
            step,
            kind,
            description,
            reasoning,
            data,
            confidence,
            Some(self.task_id),
        )
    }
}

/// Oracle answer shape shared by the single-consultation handlers.
pub(crate) trait Verdict: DeserializeOwned + Serialize {
    fn severity(&self) -> Severity;
    fn confidence(&self) -> f64;
    fn summary(&self) -> &str;
}

/// Parameters of a single-consultation handler.
pub(crate) struct Playbook<'a> {
    pub objective: &'a str,
    pub tool_id: &'a str,
    pub command: String,
    pub prompt: String,
    pub event_kind: &'a str,
}

/// Analysis → tool record → oracle → decision → evaluation → terminal event.
pub(crate) async fn run_playbook<V: Verdict>(
    agent: &Agent,
    task: &Task,
    playbook: Playbook<'_>,
) -> CyberopsResult<CyberEvent> {
    let mut thoughts = ThoughtRecorder::new(agent, task);
    let target = task.target_label();

    thoughts.record(
        ThoughtKind::Analysis,
        playbook.objective,
        format!("Task {} against {target}", task.task_id),
        task.details.clone(),
        None,
    );

    let tool_name = agent
        .tools()
        .tool_by_id(playbook.tool_id)
        .map_or_else(|| playbook.tool_id.to_string(), |t| t.name.clone());
    let execution = agent.log_tool_usage(
        playbook.tool_id,
        &playbook.command,
        target,
        task.details.clone(),
        Some(task.id),
    );
    thoughts.record(
        ThoughtKind::Action,
        format!("Running {tool_name}"),
        format!("Simulated invocation: {}", playbook.command),
        Some(serde_json::json!({ "tool_id": playbook.tool_id, "execution_id": execution.id })),
        None,
    );

    let verdict: V = match consult(agent, task, &playbook.prompt).await {
        Ok(v) => v,
        Err(e) => {
            let _ = agent.complete_tool_execution(execution.id, 1, e.to_string());
            return Err(e);
        }
    };
    agent.complete_tool_execution(execution.id, 0, verdict.summary())?;

    let payload = serde_json::to_value(&verdict)?;
    thoughts.record(
        ThoughtKind::Decision,
        verdict.summary(),
        format!("Oracle rates the finding {}", verdict.severity()),
        Some(payload.clone()),
        Some(verdict.confidence()),
    );

    agent.pause().await;

    thoughts.record(
        ThoughtKind::Evaluation,
        format!("{} finished", task.task_name),
        format!("Reporting {} severity {}", playbook.event_kind, verdict.severity()),
        None,
        Some(verdict.confidence()),
    );

    Ok(agent.emit_event(
        playbook.event_kind,
        serde_json::json!({
            "task_id": task.task_id,
            "task_name": task.task_name,
            "result": payload,
        }),
        Some(verdict.severity()),
        task.target.as_deref(),
        Some(task.id),
    ))
}

/// Ask the oracle and read the answer as `T`. Files listed under
/// `details.files` go along with the prompt.
pub(crate) async fn consult<T: DeserializeOwned>(
    agent: &Agent,
    task: &Task,
    prompt: &str,
) -> CyberopsResult<T> {
    let files = task_files(task);
    let decision = if files.is_empty() {
        agent.decide(prompt).await?
    } else {
        agent.decide_with_files(prompt, &files).await?
    };
    decision_as(decision)
}

/// File references in `details.files`. A malformed list is ignored.
pub(crate) fn task_files(task: &Task) -> Vec<FileReference> {
    task.details
        .as_ref()
        .and_then(|d| d.get("files"))
        .and_then(|f| serde_json::from_value(f.clone()).ok())
        .unwrap_or_default()
}

/// Common tail appended to every prompt.
pub(crate) fn json_instructions(shape: &str) -> String {
    format!(
        "Respond ONLY with a JSON object of this shape, no prose:\n{shape}\n\
         `confidence` is a number between 0 and 1."
    )
}

pub(crate) fn details_line(task: &Task) -> String {
    match &task.details {
        Some(details) => format!("Additional context: {details}\n"),
        None => String::new(),
    }
}
