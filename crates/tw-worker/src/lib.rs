//! Transcode worker core.
//!
//! This crate provides:
//! - The worker's single job slot (`StatusStore`) and its heartbeat
//! - The transcode pipeline and its cleanup/finish reporting
//! - A supervisor that owns the running pipeline task

pub mod cleanup;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reporter;
pub mod retry;
pub mod status;
pub mod supervisor;

pub use cleanup::Cleanup;
pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::{PipelineOutcome, TranscodePipeline};
pub use reporter::StatusReporter;
pub use status::{SlotClaim, StatusStore};
pub use supervisor::{JobRecord, JobState, JobSupervisor};
