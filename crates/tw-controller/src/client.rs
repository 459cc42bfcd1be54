//! Controller HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use tw_models::{JobFinishReport, WorkerStatusReport};

use crate::error::{ControllerError, ControllerResult};

/// Heartbeat endpoint, relative to the controller base URL.
pub const PING_PATH: &str = "/api/v1/worker/ping";
/// Finish report endpoint, relative to the controller base URL.
pub const FINISH_PATH: &str = "/api/v1/worker/finish";

/// Configuration for the controller client.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base URL of the controller
    pub base_url: String,
    /// Timeout for every request
    pub timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ControllerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TR_CONTROLLER_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("WORKER_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Client for the controller's worker endpoints.
///
/// Each call is a single attempt; retry policy belongs to the caller.
#[derive(Clone)]
pub struct ControllerClient {
    http: Client,
    base_url: String,
}

impl ControllerClient {
    /// Create a new controller client.
    pub fn new(config: ControllerConfig) -> ControllerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ControllerError::config_error(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ControllerResult<Self> {
        Self::new(ControllerConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a heartbeat carrying the worker's current status.
    pub async fn ping(&self, report: &WorkerStatusReport) -> ControllerResult<()> {
        self.post_json(PING_PATH, report).await
    }

    /// Report that a job has ended.
    pub async fn finish(&self, report: &JobFinishReport) -> ControllerResult<()> {
        self.post_json(FINISH_PATH, report).await
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ControllerResult<()> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
