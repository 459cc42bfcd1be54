//! Video server storage client.
//!
//! This crate provides:
//! - Source URL construction for the transcoder
//! - Multipart upload of output files
//! - Best-effort upload of a whole working directory

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{VideoServerClient, VideoServerConfig};
pub use error::{StorageError, StorageResult};
pub use uploader::{ChunkUploader, UploadSummary};
