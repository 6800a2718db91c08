//! End-to-end scheduling tests.
//!
//! Drives the scheduler, agents and executors together against scripted
//! oracles. Checks: capability matching, single assignment per agent, queue
//! traversal order under both policies, failure handling and the audit trail.

use async_trait::async_trait;
use cyberops_core::{CyberopsError, CyberopsResult};
use cyberops_oracle::{DecisionOracle, OracleClient};
use cyberops_orchestrator::executors::{RECONNAISSANCE, THREAT_INTEL, VULNERABILITY};
use cyberops_orchestrator::*;
use cyberops_tools::ToolRegistry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Scripted oracle
// ---------------------------------------------------------------------------

/// One answer that satisfies every executor's response shape.
const ANSWER: &str = r#"```json
{
  "open_ports": [{"port": 443, "service": "https"}],
  "subdomains": ["api.example.com"],
  "technologies": ["nginx"],
  "risk": "high",
  "vulnerabilities": [{"title": "Outdated TLS", "severity": "medium"}],
  "overall_severity": "high",
  "exploitable": false,
  "attack_vector": "network",
  "indicator_type": "ip",
  "malicious": true,
  "hypotheses": ["beaconing over DNS"],
  "findings": ["suspicious TXT queries"],
  "severity": "high",
  "confidence": 0.8,
  "summary": "Exposed admin panel"
}
```"#;

struct ScriptedOracle {
    answer: String,
    fail_first: usize,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOracle {
    fn answering() -> Self {
        Self {
            answer: ANSWER.to_string(),
            fail_first: 0,
            calls: AtomicUsize::new(0),
            gate: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn replying(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            ..Self::answering()
        }
    }

    fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::answering()
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::answering()
        }
    }

    fn client(self) -> Arc<OracleClient> {
        Arc::new(OracleClient::from_backend(Box::new(self)))
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn submit(&self, prompt: &str) -> CyberopsResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| CyberopsError::Oracle(e.to_string()))?
                .forget();
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(CyberopsError::Oracle("service unavailable".into()));
        }
        Ok(self.answer.clone())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn agent(agent_type: &str, tasks: &[&str], oracle: Arc<OracleClient>) -> Arc<Agent> {
    Arc::new(
        Agent::new(
            agent_type,
            tasks.iter().map(ToString::to_string).collect(),
            executor_for(agent_type).unwrap(),
            oracle,
        )
        .with_tools(Arc::new(ToolRegistry::with_builtin_catalog())),
    )
}

fn recon_agent(oracle: Arc<OracleClient>) -> Arc<Agent> {
    agent(
        RECONNAISSANCE,
        &["network_scan", "subdomain_enum", "service_fingerprint"],
        oracle,
    )
}

fn collect_completions(scheduler: &TaskScheduler) -> Arc<Mutex<Vec<(Task, CyberEvent)>>> {
    let done = Arc::new(Mutex::new(Vec::new()));
    let sink = done.clone();
    scheduler.set_task_complete_callback(Arc::new(move |task, event| {
        sink.lock().push((task.clone(), event.clone()));
    }));
    done
}

async fn settle(scheduler: &TaskScheduler) {
    tokio::time::timeout(Duration::from_secs(5), scheduler.wait_idle())
        .await
        .expect("scheduler did not drain");
}

/// Queue three tasks of priority 5, 9, 1 behind a single offline agent,
/// then release them and return the priorities in completion order.
async fn completion_order(scheduler: Arc<TaskScheduler>) -> Vec<i32> {
    scheduler.register_agent(recon_agent(ScriptedOracle::answering().client()));
    let done = collect_completions(&scheduler);

    scheduler.stop_all();
    for priority in [5, 9, 1] {
        let task = scheduler.create(
            TaskSpec::new(RECONNAISSANCE, "network_scan")
                .target("10.0.0.1")
                .priority(priority),
        );
        scheduler.enqueue(task).unwrap();
    }
    assert_eq!(scheduler.queued_tasks().len(), 3);

    scheduler.start_all();
    assert_eq!(scheduler.process_queue(), 1);
    settle(&scheduler).await;

    let order = done.lock().iter().map(|(t, _)| t.priority).collect();
    order
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_enqueue_assigns_immediately() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    scheduler.register_agent(worker.clone());

    let task = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();

    let assigned = scheduler.task(id).unwrap();
    assert_eq!(assigned.status, TaskStatus::Assigned);
    assert_eq!(assigned.agent_id, Some(worker.id()));
    assert!(assigned.assigned_at.is_some());
    assert_eq!(worker.status(), AgentStatus::Busy);
    assert!(scheduler.queued_tasks().is_empty());

    settle(&scheduler).await;
    assert_eq!(scheduler.task(id).unwrap().status, TaskStatus::Completed);
    assert_eq!(worker.status(), AgentStatus::Idle);
}

#[tokio::test]
async fn test_reverse_scan_runs_lowest_priority_first() {
    let order = completion_order(Arc::new(TaskScheduler::new())).await;
    assert_eq!(order, vec![1, 5, 9]);
}

#[tokio::test]
async fn test_priority_first_runs_highest_priority_first() {
    let scheduler = Arc::new(TaskScheduler::with_policy(Box::new(PriorityFirstPolicy)));
    let order = completion_order(scheduler).await;
    assert_eq!(order, vec![9, 5, 1]);
}

#[tokio::test]
async fn test_unsupported_task_fails_and_agent_recovers() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = agent(
        RECONNAISSANCE,
        &["network_scan", "port_knock"],
        ScriptedOracle::answering().client(),
    );
    scheduler.register_agent(worker.clone());
    let done = collect_completions(&scheduler);

    let task = scheduler.create_task(RECONNAISSANCE, "port_knock", None, None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    let failed = scheduler.task(id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("port_knock"));
    assert!(failed.completed_at.is_some());
    assert_eq!(worker.status(), AgentStatus::Idle);
    assert!(done.lock().is_empty());
}

#[tokio::test]
async fn test_oracle_failure_leaves_partial_trail_and_sticky_error() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::failing_first(1).client());
    scheduler.register_agent(worker.clone());
    let done = collect_completions(&scheduler);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    worker.set_event_callback(Arc::new(move |e| sink.lock().push(e.kind.clone())));

    let first = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5);
    let first_id = first.id;
    scheduler.enqueue(first).unwrap();
    settle(&scheduler).await;

    let failed = scheduler.task(first_id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("service unavailable"));
    assert!(events.lock().is_empty());
    assert!(done.lock().is_empty());

    // Steps recorded before the oracle call are kept.
    let kinds: Vec<ThoughtKind> = worker.thoughts().iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![ThoughtKind::Analysis, ThoughtKind::Action]);
    let tools = worker.tool_executions();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].exit_code, Some(1));

    // The fault is sticky: new work waits until the agent is restarted.
    assert_eq!(worker.status(), AgentStatus::Error);
    let second = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.2"), None, 5);
    let second_id = second.id;
    scheduler.enqueue(second).unwrap();
    assert_eq!(scheduler.task(second_id).unwrap().status, TaskStatus::Pending);
    assert_eq!(scheduler.agent_status_counts().error, 1);

    assert!(worker.restart());
    assert_eq!(scheduler.process_queue(), 1);
    settle(&scheduler).await;

    assert_eq!(scheduler.task(second_id).unwrap().status, TaskStatus::Completed);
    assert_eq!(events.lock().as_slice(), ["network_scan_complete"]);
    assert_eq!(done.lock().len(), 1);
}

#[tokio::test]
async fn test_capability_matching() {
    let scheduler = Arc::new(TaskScheduler::new());
    let scanner = agent(
        RECONNAISSANCE,
        &["network_scan"],
        ScriptedOracle::answering().client(),
    );
    scheduler.register_agent(scanner.clone());

    let wrong_task = scheduler.create_task(RECONNAISSANCE, "subdomain_enum", None, None, 5);
    let wrong_type = scheduler.create_task(VULNERABILITY, "vulnerability_scan", None, None, 5);
    let (wrong_task_id, wrong_type_id) = (wrong_task.id, wrong_type.id);
    scheduler.enqueue_many(vec![wrong_task, wrong_type]).unwrap();

    assert_eq!(scheduler.queued_tasks().len(), 2);
    assert_eq!(scanner.status(), AgentStatus::Idle);

    let matching = scheduler.create_task(RECONNAISSANCE, "network_scan", None, None, 5);
    let matching_id = matching.id;
    scheduler.enqueue(matching).unwrap();
    settle(&scheduler).await;

    assert_eq!(scheduler.task(matching_id).unwrap().status, TaskStatus::Completed);
    assert_eq!(scheduler.task(wrong_task_id).unwrap().status, TaskStatus::Pending);
    assert_eq!(scheduler.task(wrong_type_id).unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_agents_never_double_booked() {
    let gate = Arc::new(Semaphore::new(0));
    let oracle = ScriptedOracle::gated(gate.clone()).client();
    let scheduler = Arc::new(TaskScheduler::new());
    let a = recon_agent(oracle.clone());
    let b = recon_agent(oracle);
    scheduler.register_agent(a.clone());
    scheduler.register_agent(b.clone());

    let tasks: Vec<Task> = (0..5)
        .map(|i| scheduler.create_task(RECONNAISSANCE, "network_scan", None, None, i))
        .collect();
    scheduler.enqueue_many(tasks).unwrap();

    let in_flight = scheduler.in_flight_tasks();
    assert_eq!(in_flight.len(), 2);
    assert_ne!(in_flight[0].agent_id, in_flight[1].agent_id);
    assert_eq!(scheduler.queued_tasks().len(), 3);
    assert_eq!(scheduler.all_tasks().len(), 5);
    assert_eq!(scheduler.agent_status_counts().busy, 2);

    gate.add_permits(64);
    settle(&scheduler).await;

    let finished = scheduler.finished_tasks();
    assert_eq!(finished.len(), 5);
    assert!(finished.iter().all(|t| t.status == TaskStatus::Completed));
    let metrics = scheduler.monitor().aggregate();
    assert_eq!(metrics.tasks_completed, 5);
    assert_eq!(
        scheduler.monitor().get(a.id()).unwrap().tasks_completed
            + scheduler.monitor().get(b.id()).unwrap().tasks_completed,
        5
    );
}

#[tokio::test]
async fn test_lifecycle_timestamps_and_status_changes() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    worker.set_status_change_callback(Arc::new(move |_, s| sink.lock().push(s)));
    scheduler.register_agent(worker);

    let task = scheduler.create_task(RECONNAISSANCE, "service_fingerprint", Some("example.com"), None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    let done = scheduler.task(id).unwrap();
    let assigned = done.assigned_at.unwrap();
    let started = done.started_at.unwrap();
    let completed = done.completed_at.unwrap();
    assert!(done.created_at <= assigned);
    assert!(assigned <= started);
    assert!(started <= completed);
    assert_eq!(*statuses.lock(), vec![AgentStatus::Busy, AgentStatus::Idle]);
}

#[tokio::test]
async fn test_chain_of_thought_is_ordered() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    scheduler.register_agent(worker.clone());
    let done = collect_completions(&scheduler);

    let task = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5);
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    let thoughts = worker.thoughts();
    let steps: Vec<u32> = thoughts.iter().map(|t| t.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);
    let kinds: Vec<ThoughtKind> = thoughts.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ThoughtKind::Analysis,
            ThoughtKind::Action,
            ThoughtKind::Decision,
            ThoughtKind::Evaluation
        ]
    );
    assert!(thoughts.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(thoughts[2].confidence, Some(0.8));

    let tools = worker.tool_executions();
    assert_eq!(tools[0].tool_id, "nmap");
    assert_eq!(tools[0].exit_code, Some(0));

    let (task, event) = done.lock()[0].clone();
    assert_eq!(event.kind, "network_scan_complete");
    assert_eq!(event.severity, Severity::High);
    assert_eq!(event.task_id, Some(task.id));
    assert_eq!(event.payload["task_id"], task.task_id);
}

#[tokio::test]
async fn test_every_executor_completes() {
    let scheduler = Arc::new(TaskScheduler::new());
    let oracle = ScriptedOracle::answering().client();
    scheduler.register_agent(agent(
        VULNERABILITY,
        &["vulnerability_scan", "exploit_assessment"],
        oracle.clone(),
    ));
    scheduler.register_agent(agent(THREAT_INTEL, &["ioc_analysis", "threat_hunt"], oracle));
    let done = collect_completions(&scheduler);

    scheduler
        .enqueue_many(vec![
            scheduler.create_task(VULNERABILITY, "vulnerability_scan", Some("10.0.0.5"), None, 5),
            scheduler.create_task(VULNERABILITY, "exploit_assessment", Some("10.0.0.5"), None, 5),
            scheduler.create_task(THREAT_INTEL, "ioc_analysis", Some("203.0.113.7"), None, 5),
            scheduler.create_task(THREAT_INTEL, "threat_hunt", Some("corp-net"), None, 5),
        ])
        .unwrap();
    settle(&scheduler).await;

    let mut kinds: Vec<String> = done.lock().iter().map(|(_, e)| e.kind.clone()).collect();
    kinds.sort();
    assert_eq!(
        kinds,
        vec![
            "exploit_assessment_complete",
            "ioc_analysis_complete",
            "threat_hunt_complete",
            "vulnerability_found",
        ]
    );
}

#[tokio::test]
async fn test_callback_replacement_affects_later_records_only() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    scheduler.register_agent(worker.clone());

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = first.clone();
    worker.set_event_callback(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    scheduler
        .enqueue(scheduler.create_task(RECONNAISSANCE, "network_scan", None, None, 5))
        .unwrap();
    settle(&scheduler).await;

    let counter = second.clone();
    worker.set_event_callback(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    scheduler
        .enqueue(scheduler.create_task(RECONNAISSANCE, "subdomain_enum", None, None, 5))
        .unwrap();
    settle(&scheduler).await;

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    worker.clear_event_callback();
    scheduler
        .enqueue(scheduler.create_task(RECONNAISSANCE, "network_scan", None, None, 5))
        .unwrap();
    settle(&scheduler).await;
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wait_idle_ignores_unassignable_tasks() {
    let scheduler = Arc::new(TaskScheduler::new());
    scheduler.register_agent(recon_agent(ScriptedOracle::answering().client()));

    scheduler
        .enqueue(scheduler.create_task("forensics", "disk_image", None, None, 9))
        .unwrap();
    let runnable = scheduler.create_task(RECONNAISSANCE, "network_scan", None, None, 1);
    let runnable_id = runnable.id;
    scheduler.enqueue(runnable).unwrap();
    settle(&scheduler).await;

    assert_eq!(scheduler.task(runnable_id).unwrap().status, TaskStatus::Completed);
    assert_eq!(scheduler.queued_tasks().len(), 1);
}

#[tokio::test]
async fn test_jsonl_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(JsonlAuditSink::new(dir.path()));
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    attach_agent(&worker, audit.clone());
    attach_scheduler(&scheduler, audit.clone());
    scheduler.register_agent(worker.clone());

    scheduler
        .enqueue(scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5))
        .unwrap();
    settle(&scheduler).await;
    assert_eq!(record_tool_log(&worker, audit.as_ref()), 1);
    audit.flush().await;

    let content = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    let records: Vec<AuditRecord> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 7);

    let count = |f: fn(&AuditRecord) -> bool| records.iter().filter(|r| f(r)).count();
    assert_eq!(count(|r| matches!(r, AuditRecord::Thought(_))), 4);
    assert_eq!(count(|r| matches!(r, AuditRecord::Event(_))), 1);
    assert_eq!(count(|r| matches!(r, AuditRecord::TaskFinished(_))), 1);
    assert_eq!(count(|r| matches!(r, AuditRecord::Tool(_))), 1);
}

#[tokio::test]
async fn test_memory_audit_sink_sees_thoughts_in_order() {
    let audit = Arc::new(MemoryAuditSink::new());
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = agent(THREAT_INTEL, &["threat_hunt"], ScriptedOracle::answering().client());
    attach_agent(&worker, audit.clone());
    scheduler.register_agent(worker);

    scheduler
        .enqueue(scheduler.create_task(THREAT_INTEL, "threat_hunt", Some("corp-net"), None, 5))
        .unwrap();
    settle(&scheduler).await;

    let steps: Vec<u32> = audit
        .records()
        .into_iter()
        .filter_map(|r| match r {
            AuditRecord::Thought(t) => Some(t.step),
            _ => None,
        })
        .collect();
    assert!(!steps.is_empty());
    assert!(steps.windows(2).all(|w| w[0] < w[1]));
    assert!(matches!(
        audit.records().last(),
        Some(AuditRecord::Event(e)) if e.kind == "threat_hunt_complete"
    ));
}

#[tokio::test]
async fn test_scheduler_from_config() {
    let config = OrchestratorConfig::from_toml_str(
        r#"
        [scheduler]
        policy = "priority_first"

        [[agents]]
        name = "scout"
        agent_type = "reconnaissance"
        count = 2
        "#,
    )
    .unwrap();
    let scheduler = config
        .build_scheduler(
            ScriptedOracle::answering().client(),
            Arc::new(ToolRegistry::with_builtin_catalog()),
        )
        .unwrap();

    assert_eq!(scheduler.policy_name(), "priority_first");
    assert_eq!(scheduler.agents().len(), 2);
    assert_eq!(scheduler.agent_status_counts().idle, 2);

    let task = scheduler.create_task(RECONNAISSANCE, "subdomain_enum", Some("example.com"), None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;
    assert_eq!(scheduler.task(id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_agent_not_rebooked_before_task_is_finished() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::answering().client());
    scheduler.register_agent(worker.clone());

    // On every status change, run a pass and record what the agent holds.
    let bookings = Arc::new(Mutex::new(Vec::new()));
    let sink = bookings.clone();
    let weak = Arc::downgrade(&scheduler);
    let worker_id = worker.id();
    worker.set_status_change_callback(Arc::new(move |_, status| {
        let Some(scheduler) = weak.upgrade() else {
            return;
        };
        if status == AgentStatus::Idle {
            scheduler.process_queue();
        }
        let held = scheduler
            .in_flight_tasks()
            .into_iter()
            .filter(|t| t.agent_id == Some(worker_id))
            .count();
        sink.lock().push(held);
    }));

    let tasks: Vec<Task> = (0..2)
        .map(|_| scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5))
        .collect();
    scheduler.enqueue_many(tasks).unwrap();
    settle(&scheduler).await;

    let finished = scheduler.finished_tasks();
    assert_eq!(finished.len(), 2);
    assert!(finished.iter().all(|t| t.status == TaskStatus::Completed));
    assert!(!bookings.lock().is_empty());
    assert!(bookings.lock().iter().all(|&held| held <= 1));
    assert_eq!(worker.status(), AgentStatus::Idle);
}

#[tokio::test]
async fn test_prose_answer_fails_task_with_parse_error() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(
        ScriptedOracle::replying("The host looks fine to me, nothing to report.").client(),
    );
    scheduler.register_agent(worker.clone());
    let done = collect_completions(&scheduler);

    let task = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    let failed = scheduler.task(id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap().starts_with("Parse error"));
    assert_eq!(worker.status(), AgentStatus::Error);
    assert!(done.lock().is_empty());
    assert_eq!(scheduler.monitor().get(worker.id()).unwrap().tasks_failed, 1);
}

#[tokio::test]
async fn test_wrong_shape_answer_fails_task_with_parse_error() {
    let scheduler = Arc::new(TaskScheduler::new());
    let worker = recon_agent(ScriptedOracle::replying(r#"{"verdict": "ok"}"#).client());
    scheduler.register_agent(worker.clone());

    let task = scheduler.create_task(RECONNAISSANCE, "network_scan", Some("10.0.0.1"), None, 5);
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    let failed = scheduler.task(id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap().starts_with("Parse error"));
    assert_eq!(worker.status(), AgentStatus::Error);
}

#[tokio::test]
async fn test_task_files_reach_the_oracle() {
    let oracle = ScriptedOracle::answering();
    let prompts = oracle.prompts.clone();
    let scheduler = Arc::new(TaskScheduler::new());
    let analyst = agent(THREAT_INTEL, &["ioc_analysis"], oracle.client());
    scheduler.register_agent(analyst.clone());

    let task = scheduler.create(
        TaskSpec::new(THREAT_INTEL, "ioc_analysis")
            .target("198.51.100.7")
            .details(serde_json::json!({
                "files": [{"uri": "gs://evidence/beacon.pcap", "mime_type": "application/vnd.tcpdump.pcap"}]
            })),
    );
    let id = task.id;
    scheduler.enqueue(task).unwrap();
    settle(&scheduler).await;

    assert_eq!(scheduler.task(id).unwrap().status, TaskStatus::Completed);
    let prompts = prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("gs://evidence/beacon.pcap"));
    assert_eq!(analyst.info().status, AgentStatus::Idle);
}
