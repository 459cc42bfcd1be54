//! End-of-job cleanup: release the slot, report, remove the working directory.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use tw_controller::ControllerError;
use tw_media::remove_work_dir;
use tw_models::{JobFinishReport, JobOutcome, OutputIdentifier, TaskId};

use crate::context::WorkerContext;
use crate::metrics;
use crate::status::SlotClaim;
use crate::retry::{retry_async_when, RetryConfig, RetryResult};

const FINISH_BASE_DELAY: Duration = Duration::from_millis(500);

/// Runs once per job, whatever the pipeline outcome.
pub struct Cleanup<'a> {
    ctx: &'a WorkerContext,
}

impl<'a> Cleanup<'a> {
    pub fn new(ctx: &'a WorkerContext) -> Self {
        Self { ctx }
    }

    /// Release the worker, send the finish report and remove `work_dir`.
    ///
    /// The release happens first, so the worker can take a new job even if
    /// the controller or the filesystem misbehave. Returns whether the
    /// finish report was delivered.
    pub async fn finalize(
        &self,
        task_id: &TaskId,
        claim: SlotClaim,
        output: &OutputIdentifier,
        work_dir: Option<&Path>,
        outcome: JobOutcome,
        error: Option<String>,
    ) -> bool {
        if !self.ctx.status.release(claim) {
            warn!(task_id = %task_id, "Slot was no longer held by this job at cleanup");
        }

        self.report_and_remove(task_id, output, work_dir, outcome, error)
            .await
    }

    /// Send the finish report and remove `work_dir`, for a slot that has
    /// already been released.
    pub async fn report_and_remove(
        &self,
        task_id: &TaskId,
        output: &OutputIdentifier,
        work_dir: Option<&Path>,
        outcome: JobOutcome,
        error: Option<String>,
    ) -> bool {
        let pod_id = self.ctx.status.pod_id();
        let report = match (outcome, error) {
            (JobOutcome::Failed, error) => JobFinishReport::failed(
                pod_id,
                task_id.clone(),
                output.clone(),
                error.unwrap_or_else(|| "unknown error".to_string()),
            ),
            (JobOutcome::Succeeded, _) => {
                JobFinishReport::succeeded(pod_id, task_id.clone(), output.clone())
            }
        };
        let delivered = self.send_finish(&report).await;

        if let Some(dir) = work_dir {
            self.remove_work_dir(task_id, dir).await;
        }

        delivered
    }

    /// Remove a job's working directory. Failures are logged, not retried.
    pub async fn remove_work_dir(&self, task_id: &TaskId, dir: &Path) {
        match remove_work_dir(dir).await {
            Ok(()) => info!(task_id = %task_id, "Removed working directory {}", dir.display()),
            Err(e) => warn!(
                task_id = %task_id,
                "Failed to remove working directory {}: {}",
                dir.display(),
                e
            ),
        }
    }

    async fn send_finish(&self, report: &JobFinishReport) -> bool {
        let config = RetryConfig::new("finish_report")
            .with_max_retries(self.ctx.config.finish_max_retries)
            .with_base_delay(FINISH_BASE_DELAY);

        let result = retry_async_when(
            &config,
            || self.ctx.controller.finish(report),
            ControllerError::is_retryable,
        )
        .await;

        match result {
            RetryResult::Success(()) => {
                info!(
                    task_id = %report.assigned_task_id,
                    output = %report.output_identifier,
                    outcome = report.outcome.as_str(),
                    "Finish report delivered"
                );
                metrics::record_finish_report(true);
                true
            }
            RetryResult::Failed { error, attempts } => {
                warn!(
                    task_id = %report.assigned_task_id,
                    attempts,
                    "Finish report not delivered: {}",
                    error
                );
                metrics::record_finish_report(false);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use tempfile::TempDir;
    use tw_controller::{ControllerConfig, FINISH_PATH};
    use tw_storage::VideoServerConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(controller_url: &str, finish_max_retries: u32) -> WorkerContext {
        WorkerContext::new(WorkerConfig {
            pod_id: "pod-1".to_string(),
            finish_max_retries,
            controller: ControllerConfig {
                base_url: controller_url.to_string(),
                timeout: Duration::from_secs(5),
            },
            video_server: VideoServerConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                upload_timeout: Duration::from_secs(5),
            },
            ..WorkerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_finalize_releases_reports_and_removes_dir() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FINISH_PATH))
            .and(body_partial_json(serde_json::json!({
                "podId": "pod-1",
                "assignedTaskId": "t1",
                "outputIdentifier": "v1_abc",
                "outcome": "failed",
                "error": "boom"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server.uri(), 0);
        let claim = ctx.status.try_assign(TaskId::from("t1")).unwrap();

        let root = TempDir::new().unwrap();
        let dir = root.path().join("v1_abc");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("v1_abc"), b"manifest").unwrap();

        let delivered = Cleanup::new(&ctx)
            .finalize(
                &TaskId::from("t1"),
                claim,
                &OutputIdentifier::from_string("v1_abc"),
                Some(&dir),
                JobOutcome::Failed,
                Some("boom".to_string()),
            )
            .await;

        assert!(delivered);
        assert!(!ctx.status.is_assigned());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_finish_is_retried_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FINISH_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FINISH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let ctx = context(&server.uri(), 3);
        let claim = ctx.status.try_assign(TaskId::from("t1")).unwrap();

        let delivered = Cleanup::new(&ctx)
            .finalize(
                &TaskId::from("t1"),
                claim,
                &OutputIdentifier::from_string("v1_abc"),
                None,
                JobOutcome::Succeeded,
                None,
            )
            .await;

        assert!(delivered);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_controller_still_releases() {
        let ctx = context("http://127.0.0.1:9", 0);
        let claim = ctx.status.try_assign(TaskId::from("t1")).unwrap();

        let delivered = Cleanup::new(&ctx)
            .finalize(
                &TaskId::from("t1"),
                claim,
                &OutputIdentifier::from_string("v1_abc"),
                None,
                JobOutcome::Succeeded,
                None,
            )
            .await;

        assert!(!delivered);
        assert!(!ctx.status.is_assigned());
    }
}
