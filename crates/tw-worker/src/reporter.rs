//! Periodic heartbeat to the controller.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tw_controller::{ControllerClient, ControllerResult};

use crate::metrics;
use crate::retry::FailureTracker;
use crate::status::StatusStore;

/// Consecutive heartbeat failures logged before going quiet.
const MAX_LOGGED_FAILURES: u32 = 3;

/// Pushes the worker's status to the controller on a fixed interval.
///
/// Delivery is best-effort: a failed heartbeat is never retried, the next
/// tick carries fresher state anyway.
pub struct StatusReporter {
    store: StatusStore,
    controller: ControllerClient,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(store: StatusStore, controller: ControllerClient, interval: Duration) -> Self {
        Self {
            store,
            controller,
            interval,
        }
    }

    /// Send one heartbeat with the current snapshot.
    pub async fn report_once(&self) -> ControllerResult<()> {
        let report = self.store.snapshot().to_report();
        debug!(
            assigned = report.is_assigned_task,
            task_id = %report.assigned_task_id,
            "Sending heartbeat"
        );
        self.controller.ping(&report).await
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting status reporter every {:?}", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = FailureTracker::new(MAX_LOGGED_FAILURES);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.report_once().await {
                        Ok(()) => {
                            failures.record_success();
                            metrics::record_heartbeat(true);
                        }
                        Err(e) => {
                            if failures.record_failure() {
                                warn!("Heartbeat failed: {}", e);
                            }
                            metrics::record_heartbeat(false);
                        }
                    }
                }
            }
        }

        info!("Status reporter stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
