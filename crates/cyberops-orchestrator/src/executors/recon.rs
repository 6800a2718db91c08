use super::{
    details_line, json_instructions, run_playbook, unsupported, Playbook, TaskExecutor, Verdict,
    RECONNAISSANCE,
};
use crate::agent::Agent;
use crate::types::{CyberEvent, Severity, Task};
use async_trait::async_trait;
use cyberops_core::CyberopsResult;
use serde::{Deserialize, Serialize};

const HANDLED: &[&str] = &["network_scan", "subdomain_enum", "service_fingerprint"];

/// Reconnaissance: map the attack surface of a target.
pub struct ReconExecutor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenPort {
    pub port: u16,
    pub service: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Oracle answer for every reconnaissance task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ReconFindings {
    #[serde(default)]
    pub open_ports: Vec<OpenPort>,
    #[serde(default)]
    pub subdomains: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub risk: String,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl Verdict for ReconFindings {
    fn severity(&self) -> Severity {
        Severity::parse_label(&self.risk)
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

const SHAPE: &str = r#"{"open_ports": [{"port": 22, "service": "ssh", "version": "OpenSSH 8.9"}],
 "subdomains": ["api.example.com"], "technologies": ["nginx"],
 "risk": "info|low|medium|high|critical", "confidence": 0.0,
 "summary": "one sentence", "next_steps": ["..."]}"#;

#[async_trait]
impl TaskExecutor for ReconExecutor {
    fn agent_type(&self) -> &str {
        RECONNAISSANCE
    }

    fn handled_tasks(&self) -> &[&'static str] {
        HANDLED
    }

    async fn execute(&self, agent: &Agent, task: &Task) -> CyberopsResult<CyberEvent> {
        let target = task.target_label();
        let playbook = match task.task_name.as_str() {
            "network_scan" => Playbook {
                objective: "Map reachable hosts and exposed ports",
                tool_id: "nmap",
                command: format!("nmap -sS -T3 --top-ports 1000 {target}"),
                prompt: format!(
                    "You are a network reconnaissance analyst. Plan and assess a port scan \
                     of {target} and report the likely exposed services.\n{}{}",
                    details_line(task),
                    json_instructions(SHAPE)
                ),
                event_kind: "network_scan_complete",
            },
            "subdomain_enum" => Playbook {
                objective: "Enumerate subdomains of the target domain",
                tool_id: "amass",
                command: format!("amass enum -passive -d {target}"),
                prompt: format!(
                    "You are an OSINT analyst. Enumerate the probable subdomains of {target} \
                     and flag the ones that widen the attack surface.\n{}{}",
                    details_line(task),
                    json_instructions(SHAPE)
                ),
                event_kind: "subdomain_enum_complete",
            },
            "service_fingerprint" => Playbook {
                objective: "Fingerprint services and technologies",
                tool_id: "whatweb",
                command: format!("whatweb -a 3 {target}"),
                prompt: format!(
                    "You are a service fingerprinting analyst. Identify the software stack and \
                     versions exposed by {target}.\n{}{}",
                    details_line(task),
                    json_instructions(SHAPE)
                ),
                event_kind: "service_fingerprint_complete",
            },
            _ => return Err(unsupported(RECONNAISSANCE, task)),
        };
        run_playbook::<ReconFindings>(agent, task, playbook).await
    }
}
