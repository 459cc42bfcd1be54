//! The transcoder seam and its FFmpeg implementation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use tw_models::{OutputIdentifier, RenditionLadder};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Everything needed to transcode one job.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// URL the transcoder reads the source from
    pub source_url: String,
    /// Opaque trim-window start
    pub start_time: String,
    /// Opaque trim-window end
    pub end_time: String,
    /// Prefix for the manifest and every segment
    pub output: OutputIdentifier,
    /// Directory all output is written into
    pub work_dir: PathBuf,
}

/// Produces adaptive-streaming output for a request.
///
/// Implementations write every output file directly into `request.work_dir`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<()>;
}

/// Build the FFmpeg invocation for a request and ladder.
///
/// Video and audio maps are interleaved (`v a v a v v ...`) so stream
/// indices line up with the per-rendition options.
pub fn ladder_command(request: &TranscodeRequest, ladder: &RenditionLadder) -> FfmpegCommand {
    let prefix = request.output.as_str();

    let mut cmd = FfmpegCommand::new(&request.source_url, prefix)
        .trim(&request.start_time, &request.end_time)
        .working_dir(&request.work_dir);

    let tracks = ladder.video.len().max(ladder.audio.len());
    for i in 0..tracks {
        if i < ladder.video.len() {
            cmd = cmd.map("0:v:0");
        }
        if i < ladder.audio.len() {
            cmd = cmd.map("0:a:0");
        }
    }

    for (i, rendition) in ladder.video.iter().enumerate() {
        let stream = format!("v:{}", i);
        cmd = cmd
            .stream_opt("-c", &stream, &ladder.video_codec)
            .stream_opt("-preset", &stream, &ladder.preset)
            .stream_opt("-crf", &stream, rendition.crf.to_string())
            .stream_opt("-filter", &stream, rendition.scale_filter());
    }

    for (i, rendition) in ladder.audio.iter().enumerate() {
        let stream = format!("a:{}", i);
        cmd = cmd
            .stream_opt("-c", &stream, &ladder.audio_codec)
            .stream_opt("-b", &stream, &rendition.bitrate)
            .stream_opt("-ac", &stream, rendition.channels.to_string());
    }

    let packaging = &ladder.packaging;
    let flag = |b: bool| if b { "1" } else { "0" };
    cmd.format("dash").output_args([
        "-min_seg_duration".to_string(),
        packaging.min_seg_duration_ms.to_string(),
        "-use_template".to_string(),
        flag(packaging.use_template).to_string(),
        "-use_timeline".to_string(),
        flag(packaging.use_timeline).to_string(),
        "-init_seg_name".to_string(),
        packaging.init_segment_name(prefix),
        "-media_seg_name".to_string(),
        packaging.media_segment_name(prefix),
        "-adaptation_sets".to_string(),
        packaging.adaptation_sets.clone(),
    ])
}

/// Transcoder backed by the FFmpeg CLI.
pub struct FfmpegTranscoder {
    binary: String,
    ladder: RenditionLadder,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            ladder: RenditionLadder::default(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<()> {
        let cmd = ladder_command(request, &self.ladder);
        let runner = FfmpegRunner::new(&self.binary).with_timeout(self.timeout);

        info!(
            output = %request.output,
            source = %request.source_url,
            "Starting transcode"
        );

        let output = request.output.clone();
        runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    output = %output,
                    frame = progress.frame,
                    out_time = %progress.out_time,
                    speed = progress.speed,
                    "Transcode progress"
                );
            })
            .await
    }
}
