//! Best-effort upload of a job's output files.

use std::path::{Path, PathBuf};

use metrics::counter;
use tracing::{error, info, warn};

use tw_models::TaskId;

use crate::client::VideoServerClient;

/// Counter of per-file upload attempts, labelled by result.
pub const UPLOADS_TOTAL: &str = "tw_uploads_total";

/// What happened to each file in a directory upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// File names stored successfully
    pub uploaded: Vec<String>,
    /// File names that failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl UploadSummary {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Uploads every regular file directly inside a directory.
#[derive(Clone)]
pub struct ChunkUploader {
    client: VideoServerClient,
}

impl ChunkUploader {
    pub fn new(client: VideoServerClient) -> Self {
        Self { client }
    }

    /// Upload all files in `dir` (non-recursive), in name order.
    ///
    /// Failures are logged and skipped; the remaining files are still
    /// attempted. The result is not atomic: some files may be stored while
    /// others are not.
    pub async fn upload_all(&self, dir: impl AsRef<Path>, task_id: &TaskId) -> UploadSummary {
        let dir = dir.as_ref();
        let mut summary = UploadSummary::default();

        let files = match list_regular_files(dir).await {
            Ok(files) => files,
            Err(e) => {
                error!(task_id = %task_id, "Error reading files in {}: {}", dir.display(), e);
                return summary;
            }
        };

        info!(task_id = %task_id, "Uploading {} files from {}", files.len(), dir.display());

        for (path, name) in files {
            match self.client.upload_file(&path, &name, &name).await {
                Ok(()) => {
                    counter!(UPLOADS_TOTAL, "result" => "ok").increment(1);
                    summary.uploaded.push(name);
                }
                Err(e) => {
                    warn!(task_id = %task_id, file = %name, "Uploading file failed: {}", e);
                    counter!(UPLOADS_TOTAL, "result" => "error").increment(1);
                    summary.failed.push((name, e.to_string()));
                }
            }
        }

        summary
    }
}

/// Regular files directly inside `dir`, sorted by name.
async fn list_regular_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, String)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push((entry.path(), name)),
            Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VideoServerConfig;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uploader(base_url: &str) -> ChunkUploader {
        ChunkUploader::new(
            VideoServerClient::new(VideoServerConfig {
                base_url: base_url.to_string(),
                upload_timeout: Duration::from_secs(5),
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_uploads_only_top_level_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("b_seg"), b"b").await.unwrap();
        tokio::fs::write(dir.path().join("a_manifest"), b"a").await.unwrap();
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();
        tokio::fs::write(dir.path().join("nested").join("c"), b"c").await.unwrap();

        let summary = uploader(&server.uri())
            .upload_all(dir.path(), &TaskId::from("t1"))
            .await;

        assert_eq!(summary.uploaded, vec!["a_manifest", "b_seg"]);
        assert!(summary.is_complete());
    }

    #[tokio::test]
    async fn test_failed_file_does_not_stop_siblings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("bad_seg"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        for name in ["a_seg", "bad_seg", "c_seg"] {
            tokio::fs::write(dir.path().join(name), name.as_bytes()).await.unwrap();
        }

        let summary = uploader(&server.uri())
            .upload_all(dir.path(), &TaskId::from("t1"))
            .await;

        assert_eq!(summary.uploaded, vec!["a_seg", "c_seg"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "bad_seg");
        assert_eq!(summary.total(), 3);
    }

    #[tokio::test]
    async fn test_missing_directory_yields_empty_summary() {
        let summary = uploader("http://127.0.0.1:9")
            .upload_all("/definitely/not/here", &TaskId::from("t1"))
            .await;
        assert_eq!(summary, UploadSummary::default());
    }
}
