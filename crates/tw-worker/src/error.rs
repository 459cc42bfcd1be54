//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] tw_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] tw_storage::StorageError),

    #[error("Controller error: {0}")]
    Controller(#[from] tw_controller::ControllerError),
}
