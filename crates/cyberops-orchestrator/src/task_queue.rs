use crate::types::{Task, TaskStatus};
use cyberops_core::{CyberopsError, CyberopsResult};
use std::collections::HashMap;
use uuid::Uuid;

/// Scheduler bookkeeping: pending queue, in-flight set and finished history.
///
/// A task lives in exactly one of the three at any time.
pub struct TaskQueue {
    pending: Vec<Task>,
    in_flight: HashMap<Uuid, Task>,
    finished: Vec<Task>,
}

impl TaskQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            in_flight: HashMap::new(),
            finished: Vec::new(),
        }
    }

    /// Append a pending task. Tasks already known, or past `Pending`, are rejected.
    pub fn push(&mut self, task: Task) -> CyberopsResult<()> {
        if task.status != TaskStatus::Pending {
            return Err(CyberopsError::Orchestrator(format!(
                "task {} is {}, only pending tasks can be queued",
                task.task_id, task.status
            )));
        }
        if self.get(task.id).is_some() {
            return Err(CyberopsError::Orchestrator(format!(
                "task {} is already scheduled",
                task.task_id
            )));
        }
        self.pending.push(task);
        Ok(())
    }

    /// Pending tasks in queue order.
    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    /// Mutable pending slice, for reordering by a policy.
    pub fn pending_mut(&mut self) -> &mut [Task] {
        &mut self.pending
    }

    /// Remove a task from the pending queue.
    pub fn take_pending(&mut self, id: Uuid) -> Option<Task> {
        let pos = self.pending.iter().position(|t| t.id == id)?;
        Some(self.pending.remove(pos))
    }

    /// Track a task that has been handed to an agent.
    pub fn insert_in_flight(&mut self, task: Task) {
        self.in_flight.insert(task.id, task);
    }

    /// Mutable access to an in-flight task.
    pub fn in_flight_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.in_flight.get_mut(&id)
    }

    /// Move an in-flight task to the finished history with a terminal status.
    pub fn finish(
        &mut self,
        id: Uuid,
        status: TaskStatus,
        error: Option<String>,
    ) -> CyberopsResult<Task> {
        let mut task = self.in_flight.remove(&id).ok_or_else(|| {
            CyberopsError::Orchestrator(format!("task {id} is not in flight"))
        })?;
        if let Err(e) = task.transition(status) {
            self.in_flight.insert(id, task);
            return Err(e);
        }
        task.error = error;
        self.finished.push(task.clone());
        Ok(task)
    }

    /// Look a task up wherever it currently lives.
    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.pending
            .iter()
            .find(|t| t.id == id)
            .or_else(|| self.in_flight.get(&id))
            .or_else(|| self.finished.iter().find(|t| t.id == id))
    }

    /// In-flight tasks, oldest assignment first.
    pub fn in_flight(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.in_flight.values().collect();
        tasks.sort_by_key(|t| t.assigned_at);
        tasks
    }

    /// Completed and failed tasks in finish order.
    pub fn finished(&self) -> &[Task] {
        &self.finished
    }

    /// Number of queued tasks.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of tasks currently bound to an agent.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of tasks that finished successfully.
    pub fn completed_count(&self) -> usize {
        self.finished
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }

    /// Number of tasks that finished with an error.
    pub fn failed_count(&self) -> usize {
        self.finished
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    /// Every task the queue knows about.
    pub fn total_count(&self) -> usize {
        self.pending.len() + self.in_flight.len() + self.finished.len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
