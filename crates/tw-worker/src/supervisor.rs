//! Supervision of the running pipeline task.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use tw_models::{JobOutcome, OutputIdentifier, TaskId, TranscodeJob};

use crate::cleanup::Cleanup;
use crate::context::WorkerContext;
use crate::metrics;
use crate::pipeline::{PipelineOutcome, TranscodePipeline};
use crate::status::SlotClaim;

/// Where the last job stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Succeeded,
    Failed(String),
    Panicked(String),
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    fn label(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed(_) => "failed",
            JobState::Panicked(_) => "panicked",
        }
    }
}

/// The supervisor's record of a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub task_id: TaskId,
    /// The slot claim the job ran under; tells re-dispatches of one task apart.
    #[serde(skip)]
    pub claim: SlotClaim,
    pub output_identifier: OutputIdentifier,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn running(task_id: TaskId, claim: SlotClaim, output_identifier: OutputIdentifier) -> Self {
        Self {
            task_id,
            claim,
            output_identifier,
            state: JobState::Running,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

impl From<&PipelineOutcome> for JobState {
    fn from(outcome: &PipelineOutcome) -> Self {
        match outcome.outcome {
            JobOutcome::Succeeded => JobState::Succeeded,
            JobOutcome::Failed => {
                JobState::Failed(outcome.error.clone().unwrap_or_default())
            }
        }
    }
}

/// Owns the pipeline task of the job currently holding the worker slot.
///
/// Each launch spawns the pipeline plus a monitor that awaits its handle,
/// so a crash is observed and recorded instead of lost. If the pipeline
/// dies before its own cleanup, the monitor releases the slot, reports the
/// job as failed and removes its working directory.
#[derive(Clone)]
pub struct JobSupervisor {
    ctx: Arc<WorkerContext>,
    last: Arc<watch::Sender<Option<JobRecord>>>,
}

impl JobSupervisor {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        let (last, _rx) = watch::channel(None);
        Self {
            ctx,
            last: Arc::new(last),
        }
    }

    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.ctx
    }

    /// Start the pipeline for a job that holds the slot through `claim`.
    pub fn launch(&self, job: TranscodeJob, claim: SlotClaim) {
        let task_id = job.task_id.clone();
        let output = OutputIdentifier::generate(&job.video_id);
        info!(
            task_id = %task_id,
            claim = claim.get(),
            output = %output,
            "Launching transcode pipeline"
        );
        self.last.send_replace(Some(JobRecord::running(
            task_id.clone(),
            claim,
            output.clone(),
        )));

        let pipeline = TranscodePipeline::new(Arc::clone(&self.ctx));
        let handle = {
            let output = output.clone();
            tokio::spawn(async move { pipeline.run(job, claim, output).await })
        };

        let ctx = Arc::clone(&self.ctx);
        let last = Arc::clone(&self.last);
        tokio::spawn(async move {
            let state = match handle.await {
                Ok(outcome) => JobState::from(&outcome),
                Err(e) => {
                    let reason = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        "pipeline task cancelled".to_string()
                    };
                    error!(task_id = %task_id, "Pipeline task died: {}", reason);
                    recover_crashed(&ctx, &task_id, claim, &output, &reason).await;
                    JobState::Panicked(reason)
                }
            };

            metrics::record_job_completed(state.label());
            last.send_modify(|record| {
                if let Some(record) = record.as_mut().filter(|r| r.claim == claim) {
                    record.state = state;
                    record.finished_at = Some(Utc::now());
                }
            });
        });
    }

    /// The last launched job, if any.
    pub fn last_record(&self) -> Option<JobRecord> {
        self.last.borrow().clone()
    }

    /// Wait until no job is running, or `timeout` passes.
    ///
    /// Returns `true` if the worker went idle in time.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.last.subscribe();
        let idle = rx.wait_for(|record| record.as_ref().map_or(true, |r| !r.state.is_running()));
        let result = tokio::time::timeout(timeout, idle).await;
        matches!(result, Ok(Ok(_)))
    }

    /// Drain the in-flight job on shutdown.
    pub async fn shutdown(&self) {
        let timeout = self.ctx.config.shutdown_timeout;
        if self.last_record().map_or(true, |r| !r.state.is_running()) {
            return;
        }

        info!("Waiting up to {:?} for the in-flight job", timeout);
        if self.wait_idle(timeout).await {
            info!("In-flight job finished");
        } else {
            warn!("In-flight job still running after {:?}, shutting down anyway", timeout);
        }
    }
}

/// Finish a job whose pipeline task died.
///
/// The finish report is only sent when the crash came before the pipeline's
/// own cleanup released the slot; after that point cleanup owns the report.
async fn recover_crashed(
    ctx: &WorkerContext,
    task_id: &TaskId,
    claim: SlotClaim,
    output: &OutputIdentifier,
    reason: &str,
) {
    let work_dir = Path::new(&ctx.config.work_dir).join(output.as_str());
    let cleanup = Cleanup::new(ctx);

    if ctx.status.release(claim) {
        warn!(task_id = %task_id, "Released worker after pipeline crash");
        cleanup
            .report_and_remove(
                task_id,
                output,
                Some(&work_dir),
                JobOutcome::Failed,
                Some(format!("pipeline panicked: {}", reason)),
            )
            .await;
    } else {
        warn!(task_id = %task_id, "Pipeline crashed during its own cleanup");
        cleanup.remove_work_dir(task_id, &work_dir).await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
