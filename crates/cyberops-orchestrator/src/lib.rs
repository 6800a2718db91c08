//! Task orchestration engine for cyber operations agents.
//!
//! Tasks enter a priority queue and are dispatched to specialized agents
//! whose type and advertised task names match. Each agent reasons through
//! its task with the Decision Oracle, leaving a chain-of-thought trail, tool
//! usage records and a terminal event behind.
//!
//! # Main types
//!
//! - [`TaskScheduler`]: Priority queue, capability matching and dispatch.
//! - [`Agent`]: Worker with a status machine, audit logs and callback slots.
//! - [`TaskExecutor`]: Task logic per agent type (recon, vulnerability, threat intel).
//! - [`AssignmentPolicy`]: How the queue is ordered and visited during a pass.
//! - [`AgentMonitor`]: Per-agent execution metrics.
//! - [`AuditSink`]: Destination for thoughts, events, tool records and finished tasks.
//! - [`OrchestratorConfig`]: `cyberops.toml` loading and agent pool construction.

/// Worker agents and their status machine.
pub mod agent;
/// Audit records and sinks.
pub mod audit;
/// TOML configuration.
pub mod config;
/// Task logic per agent type.
pub mod executors;
/// Agent execution metrics.
pub mod monitor;
/// Queue ordering and traversal policies.
pub mod policy;
/// Task scheduler.
pub mod scheduler;
/// Pending, in-flight and finished task bookkeeping.
pub mod task_queue;
/// Shared types (Task, AgentStatus, ChainOfThought, CyberEvent, ...).
pub mod types;

pub use agent::{Agent, AgentInfo, EventCallback, StatusCallback, ThoughtCallback};
pub use audit::{
    attach_agent, attach_scheduler, record_tool_log, AuditRecord, AuditSink, JsonlAuditSink,
    MemoryAuditSink,
};
pub use config::{AgentConfig, OrchestratorConfig, SchedulerConfig};
pub use executors::{
    executor_for, ReconExecutor, TaskExecutor, ThreatIntelExecutor, ThoughtRecorder,
    VulnerabilityExecutor,
};
pub use monitor::{AgentMetrics, AgentMonitor};
pub use policy::{AssignmentPolicy, PolicyKind, PriorityFirstPolicy, ReverseScanPolicy};
pub use scheduler::{TaskCompleteCallback, TaskScheduler, TaskSpec};
pub use task_queue::TaskQueue;
pub use types::{
    AgentStatus, AgentStatusCounts, ChainOfThought, CyberEvent, Severity, Task, TaskStatus,
    ThoughtKind, ToolExecution, DEFAULT_PRIORITY,
};
