//! Worker metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "tw_jobs_completed_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "tw_transcode_duration_seconds";
    pub const HEARTBEATS_TOTAL: &str = "tw_heartbeats_total";
    pub const FINISH_REPORTS_TOTAL: &str = "tw_finish_reports_total";
}

fn result_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// Record how a job ended: `succeeded`, `failed` or `panicked`.
pub fn record_job_completed(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a transcoder run.
pub fn record_transcode_duration(ok: bool, duration_secs: f64) {
    let labels = [("result", result_label(ok).to_string())];
    histogram!(names::TRANSCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a heartbeat attempt.
pub fn record_heartbeat(ok: bool) {
    counter!(names::HEARTBEATS_TOTAL, "result" => result_label(ok)).increment(1);
}

/// Record a finish report delivery (after retries).
pub fn record_finish_report(ok: bool) {
    counter!(names::FINISH_REPORTS_TOTAL, "result" => result_label(ok)).increment(1);
}
