//! Axum HTTP surface of the transcode worker.
//!
//! This crate provides:
//! - Job intake (`POST /job`) enforcing the single job slot
//! - Liveness, readiness and status endpoints
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
