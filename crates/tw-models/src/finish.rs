//! Finish reports sent once per job outcome.

use serde::{Deserialize, Serialize};

use crate::{OutputIdentifier, TaskId};

/// How a job's pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
        }
    }
}

/// Body sent to the controller's finish endpoint.
///
/// `outcome` and `error` extend the plain three-field report so the
/// controller can tell a failed transcode apart from a successful one.
///
/// Delivery is at least once: a report answered with a 5xx or 429 is sent
/// again, so the controller should treat repeats for the same task and
/// output identifier as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFinishReport {
    pub pod_id: String,
    pub assigned_task_id: TaskId,
    pub output_identifier: OutputIdentifier,
    pub outcome: JobOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobFinishReport {
    pub fn succeeded(
        pod_id: impl Into<String>,
        task_id: TaskId,
        output_identifier: OutputIdentifier,
    ) -> Self {
        Self {
            pod_id: pod_id.into(),
            assigned_task_id: task_id,
            output_identifier,
            outcome: JobOutcome::Succeeded,
            error: None,
        }
    }

    pub fn failed(
        pod_id: impl Into<String>,
        task_id: TaskId,
        output_identifier: OutputIdentifier,
        error: impl Into<String>,
    ) -> Self {
        Self {
            pod_id: pod_id.into(),
            assigned_task_id: task_id,
            output_identifier,
            outcome: JobOutcome::Failed,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_wire_format() {
        let report = JobFinishReport::succeeded(
            "pod-a",
            TaskId::from("t1"),
            OutputIdentifier::from_string("v1_abc"),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "podId": "pod-a",
                "assignedTaskId": "t1",
                "outputIdentifier": "v1_abc",
                "outcome": "succeeded"
            })
        );
    }

    #[test]
    fn test_failed_carries_error() {
        let report = JobFinishReport::failed(
            "pod-a",
            TaskId::from("t1"),
            OutputIdentifier::from_string("v1_abc"),
            "ffmpeg exited with 1",
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "ffmpeg exited with 1");
    }
}
