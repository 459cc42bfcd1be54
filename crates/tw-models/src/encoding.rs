//! Rendition ladder for adaptive-streaming output.

use serde::{Deserialize, Serialize};

/// Video codec used for every rendition (SVT-AV1)
pub const DEFAULT_VIDEO_CODEC: &str = "libsvtav1";
/// SVT-AV1 preset (higher is faster)
pub const DEFAULT_PRESET: &str = "10";
/// Audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Stereo output
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;
/// Minimum DASH segment duration in milliseconds
pub const DEFAULT_MIN_SEG_DURATION_MS: u32 = 2000;

/// One video tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRendition {
    pub width: u32,
    pub height: u32,
    /// Constant Rate Factor (lower is better)
    pub crf: u8,
}

impl VideoRendition {
    pub const fn new(width: u32, height: u32, crf: u8) -> Self {
        Self { width, height, crf }
    }

    /// Scale filter for this tier, e.g. `scale=1280:720`.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }
}

/// One audio tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRendition {
    /// Bitrate, e.g. "128k"
    pub bitrate: String,
    pub channels: u8,
}

impl AudioRendition {
    pub fn new(bitrate: impl Into<String>, channels: u8) -> Self {
        Self {
            bitrate: bitrate.into(),
            channels,
        }
    }
}

/// DASH muxer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashPackaging {
    pub min_seg_duration_ms: u32,
    pub use_template: bool,
    pub use_timeline: bool,
    /// ffmpeg `-adaptation_sets` value
    pub adaptation_sets: String,
}

impl Default for DashPackaging {
    fn default() -> Self {
        Self {
            min_seg_duration_ms: DEFAULT_MIN_SEG_DURATION_MS,
            use_template: true,
            use_timeline: true,
            adaptation_sets: "id=0,streams=v id=1,streams=a".to_string(),
        }
    }
}

impl DashPackaging {
    /// Init segment name template for an output prefix.
    pub fn init_segment_name(&self, prefix: &str) -> String {
        format!("{}_chunk_$RepresentationID$_init", prefix)
    }

    /// Media segment name template for an output prefix.
    pub fn media_segment_name(&self, prefix: &str) -> String {
        format!("{}_chunk_$RepresentationID$_$Number$", prefix)
    }
}

/// The fixed set of renditions produced for every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionLadder {
    pub video_codec: String,
    pub preset: String,
    pub video: Vec<VideoRendition>,
    pub audio_codec: String,
    pub audio: Vec<AudioRendition>,
    pub packaging: DashPackaging,
}

impl Default for RenditionLadder {
    /// 144p through 1080p video plus two stereo AAC tracks.
    fn default() -> Self {
        Self {
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            video: vec![
                VideoRendition::new(256, 144, 35),
                VideoRendition::new(426, 240, 32),
                VideoRendition::new(640, 360, 30),
                VideoRendition::new(854, 480, 28),
                VideoRendition::new(1280, 720, 26),
                VideoRendition::new(1920, 1080, 24),
            ],
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio: vec![
                AudioRendition::new("128k", DEFAULT_AUDIO_CHANNELS),
                AudioRendition::new("192k", DEFAULT_AUDIO_CHANNELS),
            ],
            packaging: DashPackaging::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_shape() {
        let ladder = RenditionLadder::default();
        assert_eq!(ladder.video.len(), 6);
        assert_eq!(ladder.audio.len(), 2);

        // Quality rises with resolution.
        for pair in ladder.video.windows(2) {
            assert!(pair[0].height < pair[1].height);
            assert!(pair[0].crf > pair[1].crf);
        }
        assert_eq!(ladder.video[0].scale_filter(), "scale=256:144");
        assert_eq!(ladder.video[5].scale_filter(), "scale=1920:1080");
    }

    #[test]
    fn test_segment_templates() {
        let packaging = DashPackaging::default();
        assert_eq!(
            packaging.init_segment_name("v1_abc"),
            "v1_abc_chunk_$RepresentationID$_init"
        );
        assert_eq!(
            packaging.media_segment_name("v1_abc"),
            "v1_abc_chunk_$RepresentationID$_$Number$"
        );
    }
}
