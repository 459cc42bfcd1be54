//! Worker configuration.

use std::time::Duration;

use tw_controller::ControllerConfig;
use tw_storage::VideoServerConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identifier reported to the controller
    pub pod_id: String,
    /// Root under which per-job working directories are created
    pub work_dir: String,
    /// Heartbeat interval
    pub heartbeat_interval: Duration,
    /// Upper bound on a single transcoder run
    pub transcode_timeout: Duration,
    /// Retries for the finish report (0 sends it once)
    pub finish_max_retries: u32,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    pub controller: ControllerConfig,
    pub video_server: VideoServerConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pod_id: "transcode-worker".to_string(),
            work_dir: "/tmp/transcode-worker".to_string(),
            heartbeat_interval: Duration::from_secs(10),
            transcode_timeout: Duration::from_secs(3600), // 1 hour
            finish_max_retries: 3,
            shutdown_timeout: Duration::from_secs(30),
            ffmpeg_bin: "ffmpeg".to_string(),
            controller: ControllerConfig::default(),
            video_server: VideoServerConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            pod_id: std::env::var("POD_NAME")
                .or_else(|_| std::env::var("HOSTNAME"))
                .unwrap_or_else(|_| "transcode-worker".to_string()),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/transcode-worker".to_string()),
            heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),
            transcode_timeout: Duration::from_secs(
                std::env::var("WORKER_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            finish_max_retries: std::env::var("WORKER_FINISH_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            controller: ControllerConfig::from_env(),
            video_server: VideoServerConfig::from_env(),
        }
    }
}
