//! Application state.

use std::sync::Arc;

use tw_worker::{JobSupervisor, WorkerContext};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub worker: Arc<WorkerContext>,
    pub supervisor: JobSupervisor,
}

impl AppState {
    /// Create new application state around a worker context.
    pub fn new(config: ApiConfig, worker: WorkerContext) -> Self {
        let worker = Arc::new(worker);
        let supervisor = JobSupervisor::new(Arc::clone(&worker));

        Self {
            config,
            worker,
            supervisor,
        }
    }
}
