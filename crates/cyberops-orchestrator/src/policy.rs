//! Assignment policies: how the pending queue is ordered and visited
//! during an assignment pass.

use crate::types::Task;
use serde::{Deserialize, Serialize};

/// Ordering and traversal used by the scheduler's assignment pass.
///
/// The pass sorts the queue with [`sort`](Self::sort), then offers tasks to
/// idle agents in [`visit_order`](Self::visit_order). When agents are scarce,
/// the visit order decides who wins.
pub trait AssignmentPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Order the pending queue. Defaults to priority descending, stable.
    fn sort(&self, pending: &mut [Task]) {
        pending.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Indices of the sorted queue, in the order they are offered to agents.
    fn visit_order(&self, len: usize) -> Vec<usize>;
}

/// Legacy behavior: sorted by priority descending but visited from the
/// low-priority end, so under contention the least urgent task wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseScanPolicy;

impl AssignmentPolicy for ReverseScanPolicy {
    fn name(&self) -> &'static str {
        "reverse_scan"
    }

    fn visit_order(&self, len: usize) -> Vec<usize> {
        (0..len).rev().collect()
    }
}

/// Highest priority first; ties keep enqueue order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityFirstPolicy;

impl AssignmentPolicy for PriorityFirstPolicy {
    fn name(&self) -> &'static str {
        "priority_first"
    }

    fn visit_order(&self, len: usize) -> Vec<usize> {
        (0..len).collect()
    }
}

/// Config-facing policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    ReverseScan,
    PriorityFirst,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn AssignmentPolicy> {
        match self {
            PolicyKind::ReverseScan => Box::new(ReverseScanPolicy),
            PolicyKind::PriorityFirst => Box::new(PriorityFirstPolicy),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = cyberops_core::CyberopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reverse_scan" => Ok(PolicyKind::ReverseScan),
            "priority_first" => Ok(PolicyKind::PriorityFirst),
            other => Err(cyberops_core::CyberopsError::Config(format!(
                "unknown assignment policy '{other}' (expected reverse_scan or priority_first)"
            ))),
        }
    }
}
