//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The job body could not be parsed or failed validation.
    ///
    /// Answered with 500 to stay compatible with existing controllers.
    #[error("Malformed job: {0}")]
    MalformedJob(String),

    /// The worker already holds a task.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
}

impl ApiError {
    pub fn malformed_job(msg: impl Into<String>) -> Self {
        Self::MalformedJob(msg.into())
    }

    pub fn capacity_exceeded(msg: impl Into<String>) -> Self {
        Self::CapacityExceeded(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedJob(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::CapacityExceeded(_) => StatusCode::CONFLICT,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedJob(_) => "malformed_job",
            ApiError::CapacityExceeded(_) => "capacity_exceeded",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
