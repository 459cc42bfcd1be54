//! FFmpeg CLI wrapper for DASH transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for the rendition ladder
//! - Progress parsing from `-progress pipe:2`
//! - Bounded execution (the child is killed on timeout)
//! - The [`Transcoder`] seam used by the worker pipeline
//! - Working-directory management

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod progress;
pub mod transcoder;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{create_work_dir, remove_work_dir};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use transcoder::{ladder_command, FfmpegTranscoder, TranscodeRequest, Transcoder};
