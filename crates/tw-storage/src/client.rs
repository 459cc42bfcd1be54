//! Video server HTTP client.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use tw_models::VideoId;

use crate::error::{StorageError, StorageResult};

/// Configuration for the video server client.
#[derive(Debug, Clone)]
pub struct VideoServerConfig {
    /// Base URL of the video server
    pub base_url: String,
    /// Timeout for a single upload request
    pub upload_timeout: Duration,
}

impl Default for VideoServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

impl VideoServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VIDEO_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            upload_timeout: Duration::from_secs(
                std::env::var("WORKER_UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// Client for the video server's read and upload endpoints.
#[derive(Clone)]
pub struct VideoServerClient {
    http: Client,
    base_url: String,
}

impl VideoServerClient {
    /// Create a new client.
    pub fn new(config: VideoServerConfig) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(VideoServerConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL the transcoder reads a source video from.
    pub fn source_url(&self, video_id: &VideoId) -> String {
        format!("{}/read/{}", self.base_url, video_id)
    }

    /// Upload one file as a multipart form.
    ///
    /// Form fields: `file` (raw bytes), `file_id`, `file_name`.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        file_id: &str,
        file_name: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        let url = format!("{}/upload", self.base_url);

        let data = tokio::fs::read(path).await?;
        debug!("Uploading {} ({} bytes) to {}", path.display(), data.len(), url);

        let part = Part::bytes(data).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("file_id", file_id.to_string())
            .text("file_name", file_name.to_string());

        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected {
                file_name: file_name.to_string(),
                status: status.as_u16(),
            });
        }

        info!("Uploaded {}", file_name);
        Ok(())
    }
}
