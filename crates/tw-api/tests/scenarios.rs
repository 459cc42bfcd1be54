//! End-to-end job lifecycle scenarios against the HTTP surface.
//!
//! The controller and video server are wiremock servers; the transcoder is a
//! fake that writes DASH-shaped files into the working directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tw_api::{create_router, ApiConfig, AppState};
use tw_controller::{ControllerConfig, FINISH_PATH};
use tw_media::{MediaError, MediaResult, TranscodeRequest, Transcoder};
use tw_storage::VideoServerConfig;
use tw_worker::{JobState, WorkerConfig, WorkerContext};

enum Behavior {
    Succeed { segments: usize },
    Fail,
    Panic,
}

struct FakeTranscoder {
    behavior: Behavior,
    /// When set, each run waits for a notification before producing output.
    gate: Option<Arc<Notify>>,
}

impl FakeTranscoder {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            gate: None,
        }
    }

    fn gated(behavior: Behavior, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(behavior)
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<()> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.behavior {
            Behavior::Succeed { segments } => {
                let prefix = request.output.as_str();
                tokio::fs::write(request.work_dir.join(prefix), b"<MPD/>").await?;
                tokio::fs::write(
                    request.work_dir.join(format!("{prefix}_chunk_0_init")),
                    b"init",
                )
                .await?;
                for i in 1..segments {
                    tokio::fs::write(
                        request.work_dir.join(format!("{prefix}_chunk_0_{i}")),
                        b"segment",
                    )
                    .await?;
                }
                Ok(())
            }
            Behavior::Fail => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            )),
            Behavior::Panic => panic!("transcoder crashed"),
        }
    }
}

struct Harness {
    app: Router,
    state: AppState,
    root: TempDir,
    controller: MockServer,
    video_server: MockServer,
}

impl Harness {
    async fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self::build(transcoder, MockServer::start().await, ApiConfig::default()).await
    }

    async fn with_video_server(transcoder: Arc<dyn Transcoder>, video_server: MockServer) -> Self {
        Self::build(transcoder, video_server, ApiConfig::default()).await
    }

    async fn with_config(transcoder: Arc<dyn Transcoder>, config: ApiConfig) -> Self {
        Self::build(transcoder, MockServer::start().await, config).await
    }

    async fn build(
        transcoder: Arc<dyn Transcoder>,
        video_server: MockServer,
        config: ApiConfig,
    ) -> Self {
        let controller = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&controller)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&video_server)
            .await;

        let root = TempDir::new().unwrap();
        let worker = WorkerContext::new(WorkerConfig {
            pod_id: "pod-1".to_string(),
            work_dir: root.path().to_string_lossy().to_string(),
            finish_max_retries: 0,
            controller: ControllerConfig {
                base_url: controller.uri(),
                timeout: Duration::from_secs(5),
            },
            video_server: VideoServerConfig {
                base_url: video_server.uri(),
                upload_timeout: Duration::from_secs(5),
            },
            ..WorkerConfig::default()
        })
        .unwrap()
        .with_transcoder(transcoder);

        let state = AppState::new(config, worker);
        let app = create_router(state.clone(), None);

        Self {
            app,
            state,
            root,
            controller,
            video_server,
        }
    }

    async fn post_job(&self, body: Value) -> (StatusCode, Value) {
        self.post_raw(body.to_string()).await
    }

    async fn post_raw(&self, body: String) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/job")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_json(response).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    async fn wait_idle(&self) {
        assert!(
            self.state.supervisor.wait_idle(Duration::from_secs(10)).await,
            "job did not finish in time"
        );
    }

    async fn finish_reports(&self) -> Vec<Value> {
        self.controller
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == FINISH_PATH)
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    async fn upload_count(&self) -> usize {
        self.video_server.received_requests().await.unwrap().len()
    }
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn job(task_id: &str) -> Value {
    json!({
        "videoInternalFileId": "v1",
        "startTime": "00:00:00",
        "endTime": "00:00:10",
        "assignedTaskID": task_id
    })
}

#[tokio::test]
async fn test_successful_job_reports_and_cleans_up() {
    let h = Harness::new(Arc::new(FakeTranscoder::new(Behavior::Succeed { segments: 3 }))).await;

    let (status, body) = h.post_job(job("t1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Job received"}));

    h.wait_idle().await;

    let reports = h.finish_reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["podId"], "pod-1");
    assert_eq!(reports[0]["assignedTaskId"], "t1");
    assert_eq!(reports[0]["outcome"], "succeeded");
    let output = reports[0]["outputIdentifier"].as_str().unwrap();
    assert!(output.starts_with("v1_"));

    // manifest + init + 2 segments
    assert_eq!(h.upload_count().await, 4);
    assert!(!h.root.path().join(output).exists());
    assert!(!h.state.worker.status.is_assigned());

    let record = h.state.supervisor.last_record().unwrap();
    assert_eq!(record.state, JobState::Succeeded);
}

#[tokio::test]
async fn test_transcoder_failure_reports_failed_without_uploads() {
    let h = Harness::new(Arc::new(FakeTranscoder::new(Behavior::Fail))).await;

    let (status, _) = h.post_job(job("t1")).await;
    assert_eq!(status, StatusCode::OK);
    h.wait_idle().await;

    assert_eq!(h.upload_count().await, 0);
    let reports = h.finish_reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["assignedTaskId"], "t1");
    assert_eq!(reports[0]["outcome"], "failed");
    assert!(reports[0]["error"].as_str().unwrap().contains("FFmpeg"));
    assert!(!h.state.worker.status.is_assigned());
}

#[tokio::test]
async fn test_second_job_is_rejected_while_busy() {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(Arc::new(FakeTranscoder::gated(
        Behavior::Succeed { segments: 1 },
        gate.clone(),
    )))
    .await;

    let (status, _) = h.post_job(job("t1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h.post_job(job("t2")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "capacity_exceeded");

    let (_, current) = h.get("/status").await;
    assert_eq!(current["worker"]["isAssignedTask"], true);
    assert_eq!(current["worker"]["assignedTaskId"], "t1");

    gate.notify_one();
    h.wait_idle().await;

    let reports = h.finish_reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["assignedTaskId"], "t1");
    assert_eq!(reports[0]["outcome"], "succeeded");
}

#[tokio::test]
async fn test_partial_upload_failure_still_finishes() {
    let video_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("_chunk_0_2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&video_server)
        .await;

    let h = Harness::with_video_server(
        Arc::new(FakeTranscoder::new(Behavior::Succeed { segments: 4 })),
        video_server,
    )
    .await;

    let (status, _) = h.post_job(job("t1")).await;
    assert_eq!(status, StatusCode::OK);
    h.wait_idle().await;

    // manifest + init + 3 segments, one of which is refused
    assert_eq!(h.upload_count().await, 5);

    let reports = h.finish_reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["outcome"], "failed");
    assert_eq!(reports[0]["error"], "1 of 5 uploads failed");

    let output = reports[0]["outputIdentifier"].as_str().unwrap();
    assert!(!h.root.path().join(output).exists());
    assert!(!h.state.worker.status.is_assigned());
}

#[tokio::test]
async fn test_panicking_pipeline_returns_worker_to_idle() {
    let h = Harness::new(Arc::new(FakeTranscoder::new(Behavior::Panic))).await;

    let (status, _) = h.post_job(job("t1")).await;
    assert_eq!(status, StatusCode::OK);
    h.wait_idle().await;

    assert!(!h.state.worker.status.is_assigned());
    let record = h.state.supervisor.last_record().unwrap();
    assert!(matches!(record.state, JobState::Panicked(_)));

    // The crash is still reported once, and nothing is left on disk.
    let reports = h.finish_reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["assignedTaskId"], "t1");
    assert_eq!(reports[0]["outcome"], "failed");
    assert_eq!(reports[0]["error"], "pipeline panicked: transcoder crashed");
    assert_eq!(reports[0]["outputIdentifier"], record.output_identifier.as_str());
    assert!(!h.root.path().join(record.output_identifier.as_str()).exists());

    // The slot is usable again.
    let (status, _) = h.post_job(job("t2")).await;
    assert_eq!(status, StatusCode::OK);
    h.wait_idle().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_accept_exactly_one() {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(Arc::new(FakeTranscoder::gated(
        Behavior::Succeed { segments: 1 },
        gate.clone(),
    )))
    .await;

    let requests: Vec<_> = (0..16)
        .map(|i| {
            let app = h.app.clone();
            tokio::spawn(async move {
                let response = app
                    .oneshot(
                        Request::builder()
                            .method("POST")
                            .uri("/job")
                            .header("content-type", "application/json")
                            .body(Body::from(job(&format!("t{i}")).to_string()))
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                response.status()
            })
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for request in requests {
        let status = request.await.unwrap();
        if status == StatusCode::OK {
            accepted += 1;
        } else if status == StatusCode::CONFLICT {
            rejected += 1;
        } else {
            panic!("unexpected status {status}");
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 15);

    gate.notify_one();
    h.wait_idle().await;
    assert_eq!(h.finish_reports().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_jobs_are_rejected_without_state_change() {
    let h = Harness::new(Arc::new(FakeTranscoder::new(Behavior::Succeed { segments: 1 }))).await;

    let (status, body) = h.post_raw("{not json".to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "malformed_job");

    let (status, _) = h
        .post_job(json!({"videoInternalFileId": "v1", "assignedTaskID": "t1"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = h.post_job(job("")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let mut traversal = job("t1");
    traversal["videoInternalFileId"] = json!("../etc");
    let (status, body) = h.post_job(traversal).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "malformed_job");

    assert!(!h.state.worker.status.is_assigned());
    assert!(h.state.supervisor.last_record().is_none());
    assert!(h.finish_reports().await.is_empty());
}

#[tokio::test]
async fn test_production_hides_parser_detail() {
    let config = ApiConfig {
        environment: "production".to_string(),
        ..ApiConfig::default()
    };
    let h = Harness::with_config(
        Arc::new(FakeTranscoder::new(Behavior::Succeed { segments: 1 })),
        config,
    )
    .await;

    let (status, body) = h.post_raw("{\"secret\": 1".to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "malformed_job");
    assert_eq!(body["detail"], "Malformed job: request body is not a valid job");

    let mut dashed = job("t1");
    dashed["videoInternalFileId"] = json!("-y");
    let (status, body) = h.post_job(dashed).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "malformed_job");
    assert!(!h.state.worker.status.is_assigned());
}

#[tokio::test]
async fn test_health_endpoints() {
    let h = Harness::new(Arc::new(FakeTranscoder::new(Behavior::Succeed { segments: 1 }))).await;

    let (status, body) = h.get("/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "hello"}));

    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = h.get("/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["worker"],
        json!({"podId": "pod-1", "isAssignedTask": false, "assignedTaskId": ""})
    );
    assert_eq!(body["lastJob"], Value::Null);
}
