//! Controller client error types.

use thiserror::Error;

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Controller returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ControllerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether a later attempt may succeed without duplicating the request.
    ///
    /// Transport errors only count when the connection was never made; a
    /// timeout may hit a request the controller already processed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Network(e) => e.is_connect(),
            ControllerError::RequestFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
