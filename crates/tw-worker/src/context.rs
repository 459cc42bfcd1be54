//! Shared dependencies for job processing.

use std::sync::Arc;

use tw_controller::ControllerClient;
use tw_media::{FfmpegTranscoder, Transcoder};
use tw_storage::{ChunkUploader, VideoServerClient};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::status::StatusStore;

/// Everything a pipeline run needs, shared between the HTTP surface,
/// the heartbeat and the supervisor.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub status: StatusStore,
    pub controller: ControllerClient,
    pub video_server: VideoServerClient,
    pub uploader: ChunkUploader,
    pub transcoder: Arc<dyn Transcoder>,
}

impl WorkerContext {
    /// Build clients from config, with the FFmpeg transcoder.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let controller = ControllerClient::new(config.controller.clone())?;
        let video_server = VideoServerClient::new(config.video_server.clone())?;
        let uploader = ChunkUploader::new(video_server.clone());
        let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder::new(
            config.ffmpeg_bin.clone(),
            config.transcode_timeout,
        ));

        Ok(Self {
            status: StatusStore::new(config.pod_id.clone()),
            config,
            controller,
            video_server,
            uploader,
            transcoder,
        })
    }

    /// Swap the transcoder implementation.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }
}
