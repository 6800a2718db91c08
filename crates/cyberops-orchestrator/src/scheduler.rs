use crate::agent::Agent;
use crate::monitor::AgentMonitor;
use crate::policy::{AssignmentPolicy, ReverseScanPolicy};
use crate::task_queue::TaskQueue;
use crate::types::{AgentStatusCounts, CyberEvent, Task, TaskStatus, DEFAULT_PRIORITY};
use cyberops_core::CyberopsResult;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handler fired when a task completes successfully.
pub type TaskCompleteCallback = Arc<dyn Fn(&Task, &CyberEvent) + Send + Sync>;

/// Builder for a new task. Priority defaults to 5.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Agent type that may run the task.
    pub agent_type: String,
    /// Task name the agent must advertise.
    pub task_name: String,
    /// Host, range or domain the task runs against.
    pub target: Option<String>,
    /// Free-form context handed to the executor.
    pub details: Option<serde_json::Value>,
    /// Higher is more urgent.
    pub priority: i32,
}

impl TaskSpec {
    /// Spec for `task_name` on an agent of `agent_type`, default priority.
    pub fn new(agent_type: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task_name: task_name.into(),
            target: None,
            details: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Set the target host, range or domain.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach free-form task context.
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the priority. Higher is more urgent.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Priority queue plus capability-matched dispatch to registered agents.
///
/// Every mutation of the queue triggers an assignment pass. Executions run
/// as spawned tokio tasks, so the scheduler must be used from inside a
/// runtime and is always held in an `Arc`.
pub struct TaskScheduler {
    agents: RwLock<Vec<Arc<Agent>>>,
    queue: Mutex<TaskQueue>,
    policy: Box<dyn AssignmentPolicy>,
    monitor: Arc<AgentMonitor>,
    on_complete: RwLock<Option<TaskCompleteCallback>>,
    task_counter: AtomicU64,
    idle: Notify,
}

impl TaskScheduler {
    /// Scheduler with the default (reverse scan) policy.
    pub fn new() -> Self {
        Self::with_policy(Box::new(ReverseScanPolicy))
    }

    /// Scheduler with an explicit assignment policy.
    pub fn with_policy(policy: Box<dyn AssignmentPolicy>) -> Self {
        Self {
            agents: RwLock::new(Vec::new()),
            queue: Mutex::new(TaskQueue::new()),
            policy,
            monitor: Arc::new(AgentMonitor::new()),
            on_complete: RwLock::new(None),
            task_counter: AtomicU64::new(0),
            idle: Notify::new(),
        }
    }

    /// Name of the active assignment policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Per-agent execution metrics.
    pub fn monitor(&self) -> &Arc<AgentMonitor> {
        &self.monitor
    }

    // --- Task creation ---

    /// Build a pending task with a fresh `TASK-NNNN` id. Does not enqueue.
    pub fn create_task(
        &self,
        agent_type: &str,
        task_name: &str,
        target: Option<&str>,
        details: Option<serde_json::Value>,
        priority: i32,
    ) -> Task {
        let mut spec = TaskSpec::new(agent_type, task_name).priority(priority);
        spec.target = target.map(str::to_string);
        spec.details = details;
        self.create(spec)
    }

    /// Like [`create_task`](Self::create_task), from a [`TaskSpec`].
    pub fn create(&self, spec: TaskSpec) -> Task {
        let n = self.task_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut task = Task::new(format!("TASK-{n:04}"), spec.agent_type, spec.task_name)
            .with_priority(spec.priority);
        task.target = spec.target;
        task.details = spec.details;
        task
    }

    // --- Agents ---

    /// Add an agent. Registration order is the order agents are scanned in.
    pub fn register_agent(&self, agent: Arc<Agent>) {
        info!(
            agent = %agent.name(),
            agent_type = %agent.agent_type(),
            tasks = agent.supported_tasks().len(),
            "Agent registered"
        );
        self.monitor.register(agent.id());
        self.agents.write().push(agent);
    }

    /// Registered agents in registration order.
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.read().clone()
    }

    /// Look an agent up by id.
    pub fn agent(&self, id: Uuid) -> Option<Arc<Agent>> {
        self.agents.read().iter().find(|a| a.id() == id).cloned()
    }

    /// Tally of agents per status.
    pub fn agent_status_counts(&self) -> AgentStatusCounts {
        let mut counts = AgentStatusCounts::default();
        for agent in &*self.agents.read() {
            counts.add(agent.status());
        }
        counts
    }

    /// Bring every agent online. Busy agents stay busy until their task ends.
    pub fn start_all(&self) {
        for agent in self.agents() {
            agent.start();
        }
    }

    /// Take every agent offline. Running tasks still finish.
    pub fn stop_all(&self) {
        for agent in self.agents() {
            agent.stop();
        }
    }

    // --- Queue ---

    /// Queue a task and run an assignment pass.
    ///
    /// A task whose agent type has no agent simply stays queued.
    pub fn enqueue(self: &Arc<Self>, task: Task) -> CyberopsResult<()> {
        debug!(task = %task.task_id, priority = task.priority, "Task queued");
        self.queue.lock().push(task)?;
        self.process_queue();
        Ok(())
    }

    /// Queue several tasks, then run a single pass over all of them.
    pub fn enqueue_many(self: &Arc<Self>, tasks: Vec<Task>) -> CyberopsResult<()> {
        {
            let mut queue = self.queue.lock();
            for task in tasks {
                queue.push(task)?;
            }
        }
        self.process_queue();
        Ok(())
    }

    /// Run one assignment pass and return how many tasks were dispatched.
    pub fn process_queue(self: &Arc<Self>) -> usize {
        let agents = self.agents();
        let mut dispatched = Vec::new();

        {
            let mut queue = self.queue.lock();
            self.policy.sort(queue.pending_mut());

            // An agent goes Idle before its task leaves the in-flight set.
            let bound: HashSet<Uuid> = queue
                .in_flight()
                .iter()
                .filter_map(|t| t.agent_id)
                .collect();

            let mut picks: Vec<(Uuid, Arc<Agent>)> = Vec::new();
            for idx in self.policy.visit_order(queue.pending_count()) {
                let task = &queue.pending()[idx];
                let agent = agents.iter().find(|a| {
                    a.agent_type() == task.agent_type
                        && a.can_handle_task(&task.task_name)
                        && !bound.contains(&a.id())
                        && a.try_reserve(task.id)
                });
                if let Some(agent) = agent {
                    picks.push((task.id, Arc::clone(agent)));
                }
            }

            for (task_id, agent) in picks {
                let Some(mut task) = queue.take_pending(task_id) else {
                    agent.cancel_reservation(task_id);
                    continue;
                };
                task.agent_id = Some(agent.id());
                if let Err(e) = task.transition(TaskStatus::Assigned) {
                    error!(task = %task.task_id, error = %e, "Cannot assign task");
                    agent.cancel_reservation(task_id);
                    continue;
                }
                queue.insert_in_flight(task.clone());
                dispatched.push((task, agent));
            }
        }

        let count = dispatched.len();
        for (task, agent) in dispatched {
            info!(
                task = %task.task_id,
                task_name = %task.task_name,
                priority = task.priority,
                agent = %agent.name(),
                "Task assigned"
            );
            agent.announce_status();
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                scheduler.run_task(agent, task.id).await;
            });
        }
        count
    }

    async fn run_task(self: Arc<Self>, agent: Arc<Agent>, task_id: Uuid) {
        let task = {
            let mut queue = self.queue.lock();
            match queue.in_flight_mut(task_id) {
                Some(task) => match task.transition(TaskStatus::Executing) {
                    Ok(()) => Some(task.clone()),
                    Err(e) => {
                        error!(task = %task.task_id, error = %e, "Cannot start task");
                        None
                    }
                },
                None => None,
            }
        };
        let Some(task) = task else {
            agent.cancel_reservation(task_id);
            self.settle();
            return;
        };

        self.monitor.start_task(agent.id(), task.id);
        let started = Instant::now();
        let result = agent.execute_task(&task).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(event) => {
                let finished = self.queue.lock().finish(task_id, TaskStatus::Completed, None);
                self.monitor.record_completed(agent.id(), duration_ms);
                match finished {
                    Ok(done) => {
                        info!(
                            task = %done.task_id,
                            agent = %agent.name(),
                            event = %event.kind,
                            duration_ms,
                            "Task completed"
                        );
                        let callback = self.on_complete.read().clone();
                        if let Some(cb) = callback {
                            cb(&done, &event);
                        }
                    }
                    Err(e) => error!(task = %task.task_id, error = %e, "Cannot record completion"),
                }
            }
            Err(err) => {
                let finished =
                    self.queue
                        .lock()
                        .finish(task_id, TaskStatus::Failed, Some(err.to_string()));
                self.monitor.record_failed(agent.id(), duration_ms);
                warn!(
                    task = %task.task_id,
                    agent = %agent.name(),
                    error = %err,
                    "Task failed"
                );
                if let Err(e) = finished {
                    error!(task = %task.task_id, error = %e, "Cannot record failure");
                }
            }
        }

        self.settle();
    }

    /// Rerun the pass after a finish and wake `wait_idle` callers once drained.
    fn settle(self: &Arc<Self>) {
        self.process_queue();
        let queue = self.queue.lock();
        if queue.in_flight_count() == 0 {
            info!(
                total = queue.total_count(),
                completed = queue.completed_count(),
                failed = queue.failed_count(),
                unassigned = queue.pending_count(),
                "Scheduler idle"
            );
            drop(queue);
            self.idle.notify_waiters();
        }
    }

    /// Resolve once no task is in flight. Queued tasks that no agent can take
    /// do not count.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.queue.lock().in_flight_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Register the completion handler, replacing any previous one.
    pub fn set_task_complete_callback(&self, callback: TaskCompleteCallback) {
        *self.on_complete.write() = Some(callback);
    }

    /// Remove the completion handler.
    pub fn clear_task_complete_callback(&self) {
        *self.on_complete.write() = None;
    }

    // --- Views ---

    /// Pending tasks in their current queue order.
    pub fn queued_tasks(&self) -> Vec<Task> {
        self.queue.lock().pending().to_vec()
    }

    /// Assigned and executing tasks, oldest assignment first.
    pub fn in_flight_tasks(&self) -> Vec<Task> {
        self.queue.lock().in_flight().into_iter().cloned().collect()
    }

    /// Queued plus in-flight tasks.
    pub fn all_tasks(&self) -> Vec<Task> {
        let queue = self.queue.lock();
        queue
            .pending()
            .iter()
            .chain(queue.in_flight())
            .cloned()
            .collect()
    }

    /// Completed and failed tasks, in finish order.
    pub fn finished_tasks(&self) -> Vec<Task> {
        self.queue.lock().finished().to_vec()
    }

    /// Look a task up in the queue, in flight or in the history.
    pub fn task(&self, id: Uuid) -> Option<Task> {
        self.queue.lock().get(id).cloned()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("TaskScheduler")
            .field("policy", &self.policy.name())
            .field("agents", &self.agents.read().len())
            .field("pending", &queue.pending_count())
            .field("in_flight", &queue.in_flight_count())
            .finish()
    }
}
