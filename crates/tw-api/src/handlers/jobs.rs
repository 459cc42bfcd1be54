//! Job intake.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use tw_models::TranscodeJob;

use crate::error::{ApiError, ApiResult};
use crate::handlers::health::MessageResponse;
use crate::metrics;
use crate::state::AppState;

/// Accept a job assignment from the controller.
///
/// Answers as soon as the slot is claimed; the pipeline runs under the
/// supervisor. A second job while one is assigned is refused, never queued.
pub async fn accept_job(
    State(state): State<AppState>,
    payload: Result<Json<TranscodeJob>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(job) = payload.map_err(|e| {
        warn!("Rejecting unparseable job: {}", e.body_text());
        metrics::record_job_rejected("malformed");
        malformed(&state, e.body_text())
    })?;

    if let Err(e) = job.validate() {
        warn!(task_id = %job.task_id, "Rejecting invalid job: {}", e);
        metrics::record_job_rejected("malformed");
        return Err(malformed(&state, e.to_string()));
    }

    let Some(claim) = state.worker.status.try_assign(job.task_id.clone()) else {
        let current = state
            .worker
            .status
            .snapshot()
            .assigned_task_id()
            .map(|t| t.to_string())
            .unwrap_or_default();
        warn!(task_id = %job.task_id, current = %current, "Worker busy, rejecting job");
        metrics::record_job_rejected("capacity");
        return Err(ApiError::capacity_exceeded(format!(
            "worker is busy with task {}",
            current
        )));
    };

    info!(
        task_id = %job.task_id,
        video_id = %job.video_id,
        "Job accepted"
    );
    metrics::record_job_accepted();
    state.supervisor.launch(job, claim);

    Ok(Json(MessageResponse::new("Job received")))
}

/// Parser messages echo the request body; production answers leave them out.
fn malformed(state: &AppState, detail: String) -> ApiError {
    if state.config.is_production() {
        ApiError::malformed_job("request body is not a valid job")
    } else {
        ApiError::malformed_job(detail)
    }
}
