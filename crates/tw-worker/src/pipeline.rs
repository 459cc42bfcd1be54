//! Transcode pipeline: working directory, transcoder, upload, cleanup.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use tw_media::{create_work_dir, TranscodeRequest};
use tw_models::{JobOutcome, OutputIdentifier, TranscodeJob};
use tw_storage::UploadSummary;

use crate::cleanup::Cleanup;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::status::SlotClaim;

/// How a pipeline run ended.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub output: OutputIdentifier,
    pub outcome: JobOutcome,
    /// Set when `outcome` is `Failed`
    pub error: Option<String>,
    /// Present once the transcoder has succeeded
    pub uploads: Option<UploadSummary>,
    pub finish_delivered: bool,
}

/// Runs one job from working-directory setup to cleanup.
pub struct TranscodePipeline {
    ctx: Arc<WorkerContext>,
}

impl TranscodePipeline {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }

    /// Run the job that holds `claim`, writing under `output`.
    ///
    /// Cleanup always runs before this returns.
    pub async fn run(
        &self,
        job: TranscodeJob,
        claim: SlotClaim,
        output: OutputIdentifier,
    ) -> PipelineOutcome {
        let logger = JobLogger::new(&job.task_id, "transcode");
        let span = logger.create_span();

        self.run_inner(job, claim, output, logger)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        job: TranscodeJob,
        claim: SlotClaim,
        output: OutputIdentifier,
        logger: JobLogger,
    ) -> PipelineOutcome {
        logger.log_start(&format!(
            "video {} [{} - {}] as {}",
            job.video_id, job.start_time, job.end_time, output
        ));

        let (work_dir, result) =
            match create_work_dir(&self.ctx.config.work_dir, output.as_str()).await {
                Ok(dir) => {
                    let result = self.transcode_and_upload(&job, &output, &dir, &logger).await;
                    (Some(dir), result)
                }
                Err(e) => (None, Err(WorkerError::from(e))),
            };

        let (outcome, error) = match &result {
            Ok(summary) if summary.total() == 0 => (
                JobOutcome::Failed,
                Some("transcoder produced no output files".to_string()),
            ),
            Ok(summary) if !summary.is_complete() => (
                JobOutcome::Failed,
                Some(format!(
                    "{} of {} uploads failed",
                    summary.failed.len(),
                    summary.total()
                )),
            ),
            Ok(_) => (JobOutcome::Succeeded, None),
            Err(e) => (JobOutcome::Failed, Some(e.to_string())),
        };

        match &error {
            Some(reason) => logger.log_error(reason),
            None => logger.log_completion(&format!("output {}", output)),
        }

        let finish_delivered = Cleanup::new(&self.ctx)
            .finalize(
                &job.task_id,
                claim,
                &output,
                work_dir.as_deref(),
                outcome,
                error.clone(),
            )
            .await;

        PipelineOutcome {
            output,
            outcome,
            error,
            uploads: result.ok(),
            finish_delivered,
        }
    }

    async fn transcode_and_upload(
        &self,
        job: &TranscodeJob,
        output: &OutputIdentifier,
        work_dir: &Path,
        logger: &JobLogger,
    ) -> WorkerResult<UploadSummary> {
        let request = TranscodeRequest {
            source_url: self.ctx.video_server.source_url(&job.video_id),
            start_time: job.start_time.clone(),
            end_time: job.end_time.clone(),
            output: output.clone(),
            work_dir: work_dir.to_path_buf(),
        };

        let started = Instant::now();
        let transcoded = self.ctx.transcoder.transcode(&request).await;
        metrics::record_transcode_duration(transcoded.is_ok(), started.elapsed().as_secs_f64());
        transcoded?;

        logger.log_progress(&format!(
            "transcode finished in {:.1}s, uploading",
            started.elapsed().as_secs_f64()
        ));

        let summary = self.ctx.uploader.upload_all(work_dir, &job.task_id).await;
        if summary.is_complete() {
            logger.log_progress(&format!("uploaded {} files", summary.uploaded.len()));
        } else {
            logger.log_warning(&format!(
                "uploaded {} files, {} failed",
                summary.uploaded.len(),
                summary.failed.len()
            ));
        }

        Ok(summary)
    }
}
