//! Output identifiers for transcoded renditions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::VideoId;

/// Length of the random suffix appended to the video id.
const SUFFIX_LEN: usize = 12;

/// Name shared by a job's manifest, its segments and its working directory.
///
/// Format: `{video_id}_{suffix}` with a fresh random suffix, so resubmitting
/// the same video never overwrites an earlier run's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputIdentifier(pub String);

impl OutputIdentifier {
    /// Generate a new identifier for a video.
    pub fn generate(video_id: &VideoId) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}_{}", video_id, &suffix[..SUFFIX_LEN]))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
