use super::{
    consult, details_line, json_instructions, run_playbook, unsupported, Playbook, TaskExecutor,
    ThoughtRecorder, Verdict, THREAT_INTEL,
};
use crate::agent::Agent;
use crate::types::{CyberEvent, Severity, Task, ThoughtKind};
use async_trait::async_trait;
use cyberops_core::CyberopsResult;
use serde::{Deserialize, Serialize};

const HANDLED: &[&str] = &["ioc_analysis", "threat_hunt"];

/// Threat intelligence: classify indicators and hunt for adversary activity.
pub struct ThreatIntelExecutor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IocVerdict {
    pub indicator_type: String,
    pub malicious: bool,
    #[serde(default)]
    pub threat_actor: Option<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    pub severity: String,
    pub confidence: f64,
    pub summary: String,
}

impl Verdict for IocVerdict {
    fn severity(&self) -> Severity {
        if self.malicious {
            Severity::parse_label(&self.severity)
        } else {
            Severity::Info
        }
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HuntPlan {
    pub hypotheses: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HuntResult {
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    pub severity: String,
    pub confidence: f64,
    pub summary: String,
}

const IOC_SHAPE: &str = r#"{"indicator_type": "ip|domain|hash|url", "malicious": true,
 "threat_actor": "APT29", "techniques": ["T1071"],
 "severity": "info|low|medium|high|critical", "confidence": 0.0, "summary": "one sentence"}"#;

const PLAN_SHAPE: &str = r#"{"hypotheses": ["..."], "confidence": 0.0}"#;

const HUNT_SHAPE: &str = r#"{"findings": ["..."], "techniques": ["T1059"],
 "severity": "info|low|medium|high|critical", "confidence": 0.0, "summary": "one sentence"}"#;

impl ThreatIntelExecutor {
    /// Two consultations: form hunting hypotheses, then judge them.
    async fn threat_hunt(&self, agent: &Agent, task: &Task) -> CyberopsResult<CyberEvent> {
        let mut thoughts = ThoughtRecorder::new(agent, task);
        let target = task.target_label();

        thoughts.record(
            ThoughtKind::Analysis,
            "Scope the hunt",
            format!("Looking for adversary activity in {target}"),
            task.details.clone(),
            None,
        );

        let plan: HuntPlan = consult(
            agent,
            task,
            &format!(
                "You are a threat hunter. Propose up to five testable hypotheses about \
                 adversary activity in {target}.\n{}{}",
                details_line(task),
                json_instructions(PLAN_SHAPE)
            ),
        )
        .await?;
        thoughts.record(
            ThoughtKind::Decision,
            format!("{} hypotheses to test", plan.hypotheses.len()),
            plan.hypotheses.join("; "),
            Some(serde_json::to_value(&plan)?),
            Some(plan.confidence),
        );

        let execution = agent.log_tool_usage(
            "yara",
            format!("yara -r hunt_rules.yar {target}"),
            target,
            Some(serde_json::json!({ "hypotheses": plan.hypotheses })),
            Some(task.id),
        );
        thoughts.record(
            ThoughtKind::Action,
            "Sweep for hypothesis evidence",
            format!("Simulated invocation: {}", execution.command),
            Some(serde_json::json!({ "tool_id": "yara", "execution_id": execution.id })),
            None,
        );
        agent.pause().await;

        let verdict: CyberopsResult<HuntResult> = consult(
            agent,
            task,
            &format!(
                "You are a threat hunter. For {target}, evaluate these hypotheses and report \
                 what evidence most likely exists:\n- {}\n{}",
                plan.hypotheses.join("\n- "),
                json_instructions(HUNT_SHAPE)
            ),
        )
        .await;
        let result = match verdict {
            Ok(r) => r,
            Err(e) => {
                let _ = agent.complete_tool_execution(execution.id, 1, e.to_string());
                return Err(e);
            }
        };
        agent.complete_tool_execution(execution.id, 0, &result.summary)?;

        let severity = Severity::parse_label(&result.severity);
        let payload = serde_json::to_value(&result)?;
        thoughts.record(
            ThoughtKind::Evaluation,
            result.summary.as_str(),
            format!("{} findings, severity {severity}", result.findings.len()),
            Some(payload.clone()),
            Some(result.confidence),
        );

        Ok(agent.emit_event(
            "threat_hunt_complete",
            serde_json::json!({
                "task_id": task.task_id,
                "task_name": task.task_name,
                "hypotheses": plan.hypotheses,
                "result": payload,
            }),
            Some(severity),
            task.target.as_deref(),
            Some(task.id),
        ))
    }
}

#[async_trait]
impl TaskExecutor for ThreatIntelExecutor {
    fn agent_type(&self) -> &str {
        THREAT_INTEL
    }

    fn handled_tasks(&self) -> &[&'static str] {
        HANDLED
    }

    async fn execute(&self, agent: &Agent, task: &Task) -> CyberopsResult<CyberEvent> {
        let target = task.target_label();
        match task.task_name.as_str() {
            "ioc_analysis" => {
                let playbook = Playbook {
                    objective: "Classify the indicator of compromise",
                    tool_id: "virustotal",
                    command: format!("vt search {target}"),
                    prompt: format!(
                        "You are a threat intelligence analyst. Classify the indicator \
                         {target}: is it malicious, which actor and ATT&CK techniques are \
                         associated with it?\n{}{}",
                        details_line(task),
                        json_instructions(IOC_SHAPE)
                    ),
                    event_kind: "ioc_analysis_complete",
                };
                run_playbook::<IocVerdict>(agent, task, playbook).await
            }
            "threat_hunt" => self.threat_hunt(agent, task).await,
            _ => Err(unsupported(THREAT_INTEL, task)),
        }
    }
}
