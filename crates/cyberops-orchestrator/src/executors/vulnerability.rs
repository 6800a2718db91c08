use super::{
    details_line, json_instructions, run_playbook, unsupported, Playbook, TaskExecutor, Verdict,
    VULNERABILITY,
};
use crate::agent::Agent;
use crate::types::{CyberEvent, Severity, Task};
use async_trait::async_trait;
use cyberops_core::CyberopsResult;
use serde::{Deserialize, Serialize};

const HANDLED: &[&str] = &["vulnerability_scan", "exploit_assessment"];

/// Vulnerability assessment: find weaknesses and judge their exploitability.
pub struct VulnerabilityExecutor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Finding {
    pub title: String,
    pub severity: String,
    #[serde(default)]
    pub cve: Option<String>,
    #[serde(default)]
    pub cvss: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScanReport {
    pub vulnerabilities: Vec<Finding>,
    pub overall_severity: String,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub remediation: Vec<String>,
}

impl Verdict for ScanReport {
    /// The worse of the reported overall severity and the worst single finding.
    fn severity(&self) -> Severity {
        self.vulnerabilities
            .iter()
            .map(|f| Severity::parse_label(&f.severity))
            .chain(std::iter::once(Severity::parse_label(&self.overall_severity)))
            .max()
            .unwrap_or(Severity::Info)
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExploitAssessment {
    pub exploitable: bool,
    pub attack_vector: String,
    pub severity: String,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Verdict for ExploitAssessment {
    fn severity(&self) -> Severity {
        let rated = Severity::parse_label(&self.severity);
        // A finding nobody can exploit is never worse than medium.
        if self.exploitable {
            rated
        } else {
            rated.min(Severity::Medium)
        }
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

const SCAN_SHAPE: &str = r#"{"vulnerabilities": [{"title": "...", "severity": "high", "cve": "CVE-2024-0001", "cvss": 8.1}],
 "overall_severity": "info|low|medium|high|critical", "confidence": 0.0,
 "summary": "one sentence", "remediation": ["..."]}"#;

const EXPLOIT_SHAPE: &str = r#"{"exploitable": true, "attack_vector": "network|adjacent|local|physical",
 "severity": "info|low|medium|high|critical", "confidence": 0.0,
 "summary": "one sentence", "prerequisites": ["..."]}"#;

#[async_trait]
impl TaskExecutor for VulnerabilityExecutor {
    fn agent_type(&self) -> &str {
        VULNERABILITY
    }

    fn handled_tasks(&self) -> &[&'static str] {
        HANDLED
    }

    async fn execute(&self, agent: &Agent, task: &Task) -> CyberopsResult<CyberEvent> {
        let target = task.target_label();
        match task.task_name.as_str() {
            "vulnerability_scan" => {
                let playbook = Playbook {
                    objective: "Identify known vulnerabilities on the target",
                    tool_id: "nuclei",
                    command: format!("nuclei -u {target} -severity low,medium,high,critical"),
                    prompt: format!(
                        "You are a vulnerability analyst. Assess {target} for known \
                         vulnerabilities and misconfigurations, citing CVEs where known.\n{}{}",
                        details_line(task),
                        json_instructions(SCAN_SHAPE)
                    ),
                    event_kind: "vulnerability_found",
                };
                run_playbook::<ScanReport>(agent, task, playbook).await
            }
            "exploit_assessment" => {
                let playbook = Playbook {
                    objective: "Judge whether the reported weakness is exploitable",
                    tool_id: "sqlmap",
                    command: format!("sqlmap -u {target} --batch --level 1 --risk 1"),
                    prompt: format!(
                        "You are a penetration tester. Without performing any attack, judge \
                         whether the weakness described for {target} is exploitable and how.\n{}{}",
                        details_line(task),
                        json_instructions(EXPLOIT_SHAPE)
                    ),
                    event_kind: "exploit_assessment_complete",
                };
                run_playbook::<ExploitAssessment>(agent, task, playbook).await
            }
            _ => Err(unsupported(VULNERABILITY, task)),
        }
    }
}
