//! Job assignments received from the controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a controller task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a source video on the video server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A transcode assignment.
///
/// Immutable once accepted. `start_time` and `end_time` are opaque trim-window
/// markers handed to the transcoder as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeJob {
    #[serde(rename = "videoInternalFileId")]
    pub video_id: VideoId,

    #[serde(rename = "startTime")]
    pub start_time: String,

    #[serde(rename = "endTime")]
    pub end_time: String,

    #[serde(rename = "assignedTaskID")]
    pub task_id: TaskId,
}

impl TranscodeJob {
    pub fn new(
        video_id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            video_id: VideoId(video_id.into()),
            start_time: start_time.into(),
            end_time: end_time.into(),
            task_id: TaskId(task_id.into()),
        }
    }
}

/// Reasons a job assignment is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobValidationError {
    #[error("assignedTaskID is empty")]
    EmptyTaskId,

    #[error("videoInternalFileId is empty")]
    EmptyVideoId,

    #[error("videoInternalFileId must be a single path segment: {0}")]
    UnsafeVideoId(String),

    #[error("videoInternalFileId must not start with '-': {0}")]
    LeadingDash(String),
}

impl TranscodeJob {
    /// Check the fields the worker depends on.
    ///
    /// The video id names on-disk output, so it must be a plain path segment.
    /// It is also the transcoder's positional output argument, so it cannot
    /// look like an option. The trim window is not inspected.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        if self.task_id.as_str().is_empty() {
            return Err(JobValidationError::EmptyTaskId);
        }
        let id = self.video_id.as_str();
        if id.is_empty() {
            return Err(JobValidationError::EmptyVideoId);
        }
        if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(JobValidationError::UnsafeVideoId(id.to_string()));
        }
        if id.starts_with('-') {
            return Err(JobValidationError::LeadingDash(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_names() {
        let job: TranscodeJob = serde_json::from_str(
            r#"{"videoInternalFileId":"v1","startTime":"00:00:00","endTime":"00:00:10","assignedTaskID":"t1"}"#,
        )
        .unwrap();

        assert_eq!(job.video_id.as_str(), "v1");
        assert_eq!(job.start_time, "00:00:00");
        assert_eq!(job.end_time, "00:00:10");
        assert_eq!(job.task_id.as_str(), "t1");
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result: Result<TranscodeJob, _> =
            serde_json::from_str(r#"{"videoInternalFileId":"v1","startTime":"0"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_task_id_fails_validation() {
        let job = TranscodeJob::new("v1", "0", "10", "");
        assert_eq!(job.validate(), Err(JobValidationError::EmptyTaskId));
    }

    #[test]
    fn test_video_id_must_be_path_segment() {
        for bad in ["", "..", "a/b", "..\\x"] {
            let job = TranscodeJob::new(bad, "0", "10", "t1");
            assert!(job.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_video_id_cannot_look_like_an_option() {
        let job = TranscodeJob::new("-y", "0", "10", "t1");
        assert_eq!(
            job.validate(),
            Err(JobValidationError::LeadingDash("-y".to_string()))
        );
        assert!(TranscodeJob::new("v-1", "0", "10", "t1").validate().is_ok());
    }

    #[test]
    fn test_trim_window_is_not_validated() {
        let job = TranscodeJob::new("v1", "whenever", "", "t1");
        assert!(job.validate().is_ok());
    }
}
