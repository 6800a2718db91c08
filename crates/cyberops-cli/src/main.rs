use clap::{Parser, Subcommand};
use cyberops_oracle::OracleClient;
use cyberops_orchestrator::{
    attach_agent, executor_for, record_tool_log, AgentInfo, AuditRecord, AuditSink, CyberEvent,
    JsonlAuditSink, OrchestratorConfig, PolicyKind, Task, TaskSpec, DEFAULT_PRIORITY,
};
use cyberops_tools::ToolRegistry;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "cyberops.toml";

#[derive(Parser)]
#[command(name = "cyberops", about = "Cyberops — AI-driven security task orchestrator")]
struct Cli {
    /// Path to config file (defaults to ./cyberops.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue tasks and run them to completion
    Run {
        /// Task as `agent_type:task_name[@target][!priority]`, repeatable
        #[arg(short, long = "task", required = true)]
        tasks: Vec<String>,
        /// Assignment policy (overrides config)
        #[arg(long)]
        policy: Option<PolicyKind>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the configured agent pool
    Agents,
    /// List the tool catalog
    Tools {
        /// Only tools recommended for this agent type
        #[arg(long)]
        agent_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_env();

    match cli.command {
        Commands::Run {
            tasks,
            policy,
            json,
        } => {
            if let Some(policy) = policy {
                config.scheduler.policy = policy;
            }
            let specs = tasks
                .iter()
                .map(String::as_str)
                .map(parse_task_arg)
                .collect::<anyhow::Result<Vec<_>>>()?;
            run(config, specs, json).await?;
        }
        Commands::Agents => {
            let tools = ToolRegistry::with_builtin_catalog();
            let entries = config.effective_agents();
            println!("Agent pool:");
            for entry in &entries {
                let tasks: Vec<String> = if entry.supported_tasks.is_empty() {
                    executor_for(&entry.agent_type)
                        .map(|e| e.handled_tasks().iter().map(ToString::to_string).collect())
                        .unwrap_or_default()
                } else {
                    entry.supported_tasks.clone()
                };
                let name = entry.name.as_deref().unwrap_or(&entry.agent_type);
                println!("  {name} ({}) x{}", entry.agent_type, entry.count);
                println!("    Tasks: {}", tasks.join(", "));
                let recommended: Vec<&str> = tools
                    .tools_for_agent_type(&entry.agent_type)
                    .into_iter()
                    .map(|t| t.id.as_str())
                    .collect();
                if !recommended.is_empty() {
                    println!("    Tools: {}", recommended.join(", "));
                }
            }
            let total: usize = entries.iter().map(|e| e.count).sum();
            println!("\nTotal: {total} agent(s), policy {:?}", config.scheduler.policy);
        }
        Commands::Tools { agent_type } => {
            let registry = ToolRegistry::with_builtin_catalog();
            let tools = match &agent_type {
                Some(t) => registry.tools_for_agent_type(t),
                None => registry.list_descriptors(),
            };
            if tools.is_empty() {
                println!("No tools registered.");
            } else {
                println!("Registered tools:");
                for tool in &tools {
                    println!(
                        "  {} [{:?}, risk {}] — {}",
                        tool.name, tool.category, tool.risk_level, tool.description
                    );
                    if !tool.techniques.is_empty() {
                        println!("    Techniques: {}", tool.techniques.join(", "));
                    }
                }
                println!("\nTotal: {} tool(s)", tools.len());
            }
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the given config file, or `./cyberops.toml` if it exists, or defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<OrchestratorConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                info!("No {DEFAULT_CONFIG} found, using built-in defaults");
                return Ok(OrchestratorConfig::default());
            }
            default
        }
    };
    Ok(OrchestratorConfig::load(&path)?)
}

/// Parse `agent_type:task_name[@target][!priority]`.
fn parse_task_arg(arg: &str) -> anyhow::Result<TaskSpec> {
    let (rest, priority) = match arg.rsplit_once('!') {
        Some((rest, p)) => {
            let priority: i32 = p
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid priority '{p}' in task '{arg}'"))?;
            (rest, priority)
        }
        None => (arg, DEFAULT_PRIORITY),
    };
    let (kind, target) = match rest.split_once('@') {
        Some((kind, target)) if !target.trim().is_empty() => (kind, Some(target.trim())),
        Some(_) => anyhow::bail!("empty target in task '{arg}'"),
        None => (rest, None),
    };
    let (agent_type, task_name) = kind
        .split_once(':')
        .map(|(a, t)| (a.trim(), t.trim()))
        .filter(|(a, t)| !a.is_empty() && !t.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("task '{arg}' must look like agent_type:task_name[@target][!priority]")
        })?;

    let mut spec = TaskSpec::new(agent_type, task_name).priority(priority);
    if let Some(target) = target {
        spec = spec.target(target);
    }
    Ok(spec)
}

async fn run(config: OrchestratorConfig, specs: Vec<TaskSpec>, json: bool) -> anyhow::Result<()> {
    if config.oracle.api_key.is_empty() {
        anyhow::bail!(
            "no oracle API key: set oracle.api_key or {}",
            config.oracle.api_key_env()
        );
    }

    let tools = Arc::new(ToolRegistry::with_builtin_catalog());
    let oracle = Arc::new(OracleClient::new(config.oracle.clone()));
    let scheduler = config.build_scheduler(oracle, tools)?;

    let audit = Arc::new(JsonlAuditSink::new(config.data_dir.join("audit")));
    for agent in scheduler.agents() {
        attach_agent(&agent, audit.clone());
    }

    let completed: Arc<Mutex<Vec<(Task, CyberEvent)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = completed.clone();
    let trail = audit.clone();
    scheduler.set_task_complete_callback(Arc::new(move |task, event| {
        trail.record(AuditRecord::TaskFinished(task.clone()));
        sink.lock().push((task.clone(), event.clone()));
    }));

    let tasks: Vec<Task> = specs.into_iter().map(|s| scheduler.create(s)).collect();
    info!(count = tasks.len(), policy = scheduler.policy_name(), "Queueing tasks");
    scheduler.enqueue_many(tasks)?;

    tokio::select! {
        () = scheduler.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; in-flight tasks abandoned");
            scheduler.stop_all();
        }
    }

    for agent in scheduler.agents() {
        record_tool_log(&agent, audit.as_ref());
    }
    audit.flush().await;

    let stranded = scheduler.queued_tasks();
    for task in &stranded {
        warn!(
            task = %task.task_id,
            agent_type = %task.agent_type,
            task_name = %task.task_name,
            "No agent can take this task"
        );
    }

    let finished = scheduler.finished_tasks();
    let events: Vec<CyberEvent> = completed.lock().iter().map(|(_, e)| e.clone()).collect();

    if json {
        let agents: Vec<AgentInfo> = scheduler.agents().iter().map(|a| a.info()).collect();
        let report = serde_json::json!({
            "agents": agents,
            "finished": finished,
            "unassigned": stranded,
            "events": events,
            "metrics": scheduler.monitor().to_json(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for task in &finished {
            let outcome = match events.iter().find(|e| e.task_id == Some(task.id)) {
                Some(event) => format!("{} ({})", event.kind, event.severity),
                None => task.error.clone().unwrap_or_default(),
            };
            println!(
                "{} {}/{} [{}] {}: {}",
                task.task_id,
                task.agent_type,
                task.task_name,
                task.target_label(),
                task.status,
                outcome
            );
        }
        println!(
            "\n{} finished, {} unassigned. Audit trail: {}",
            finished.len(),
            stranded.len(),
            audit.path().display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_task_arg() {
        let spec = parse_task_arg("reconnaissance:network_scan@10.0.0.1!9").unwrap();
        assert_eq!(spec.agent_type, "reconnaissance");
        assert_eq!(spec.task_name, "network_scan");
        assert_eq!(spec.target.as_deref(), Some("10.0.0.1"));
        assert_eq!(spec.priority, 9);
    }

    #[test]
    fn test_parse_minimal_task_arg() {
        let spec = parse_task_arg("threat_intel:threat_hunt").unwrap();
        assert_eq!(spec.target, None);
        assert_eq!(spec.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_parse_negative_priority_without_target() {
        let spec = parse_task_arg("vulnerability:vulnerability_scan!-2").unwrap();
        assert_eq!(spec.priority, -2);
        assert_eq!(spec.target, None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_task_arg("network_scan").is_err());
        assert!(parse_task_arg("reconnaissance:").is_err());
        assert!(parse_task_arg("reconnaissance:network_scan@").is_err());
        assert!(parse_task_arg("reconnaissance:network_scan!high").is_err());
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyberops.toml");
        std::fs::write(
            &path,
            "[scheduler]\npolicy = \"priority_first\"\n\n[[agents]]\nagent_type = \"threat_intel\"\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scheduler.policy, PolicyKind::PriorityFirst);
        assert_eq!(config.effective_agents().len(), 1);
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
