//! Shared data models for the transcode worker.
//!
//! This crate provides Serde-serializable types for:
//! - Job assignments received from the controller
//! - Worker status and heartbeat payloads
//! - Finish reports
//! - The fixed DASH rendition ladder

pub mod encoding;
pub mod finish;
pub mod job;
pub mod output;
pub mod status;

// Re-export common types
pub use encoding::{AudioRendition, DashPackaging, RenditionLadder, VideoRendition};
pub use finish::{JobFinishReport, JobOutcome};
pub use job::{JobValidationError, TaskId, TranscodeJob, VideoId};
pub use output::OutputIdentifier;
pub use status::{Assignment, WorkerStatus, WorkerStatusReport};
