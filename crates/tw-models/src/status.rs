//! Worker assignment status and its heartbeat projection.

use serde::{Deserialize, Serialize};

use crate::TaskId;

/// Whether the worker currently holds a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Assignment {
    #[default]
    Idle,
    Assigned(TaskId),
}

impl Assignment {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Assignment::Assigned(_))
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Assignment::Idle => None,
            Assignment::Assigned(task_id) => Some(task_id),
        }
    }
}

/// The worker's current assignment state.
///
/// The assigned flag and the task id cannot disagree: both are derived from
/// [`Assignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub pod_id: String,
    pub assignment: Assignment,
}

impl WorkerStatus {
    /// Create an idle status for the given pod.
    pub fn idle(pod_id: impl Into<String>) -> Self {
        Self {
            pod_id: pod_id.into(),
            assignment: Assignment::Idle,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment.is_assigned()
    }

    pub fn assigned_task_id(&self) -> Option<&TaskId> {
        self.assignment.task_id()
    }

    /// Project into the heartbeat payload.
    pub fn to_report(&self) -> WorkerStatusReport {
        WorkerStatusReport {
            pod_id: self.pod_id.clone(),
            is_assigned_task: self.is_assigned(),
            assigned_task_id: self
                .assigned_task_id()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Heartbeat body sent to the controller's ping endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatusReport {
    pub pod_id: String,
    pub is_assigned_task: bool,
    /// Empty when idle.
    pub assigned_task_id: String,
}
