//! The worker's single job slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use tw_models::{Assignment, TaskId, WorkerStatus};

/// Proof of one successful [`StatusStore::try_assign`].
///
/// Every claim is distinct, even when the controller sends the same task id
/// twice, so a finished job can never release the slot of its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotClaim(u64);

impl SlotClaim {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Synchronized holder of the worker's assignment state.
///
/// Backed by a watch channel: every transition happens inside
/// `send_if_modified`, so check-and-set is a single step and readers
/// always see a whole [`WorkerStatus`]. The current claim is only read and
/// written inside those closures, under the channel's lock.
#[derive(Clone)]
pub struct StatusStore {
    tx: Arc<watch::Sender<WorkerStatus>>,
    /// Claim holding the slot, 0 when idle.
    current: Arc<AtomicU64>,
    issued: Arc<AtomicU64>,
}

impl StatusStore {
    /// Create an idle store for the given pod.
    pub fn new(pod_id: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(WorkerStatus::idle(pod_id));
        Self {
            tx: Arc::new(tx),
            current: Arc::new(AtomicU64::new(0)),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Claim the slot for `task_id`.
    ///
    /// Returns `None` without touching the state if a task is already assigned.
    pub fn try_assign(&self, task_id: TaskId) -> Option<SlotClaim> {
        let mut claim = None;
        self.tx.send_if_modified(|status| {
            if status.is_assigned() {
                return false;
            }
            let id = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
            self.current.store(id, Ordering::Relaxed);
            status.assignment = Assignment::Assigned(task_id);
            claim = Some(SlotClaim(id));
            true
        });
        claim
    }

    /// Return to idle if the slot is still held by `claim`.
    ///
    /// Returns `false`, leaving the state alone, when the claim was already
    /// released or a newer claim holds the slot.
    pub fn release(&self, claim: SlotClaim) -> bool {
        self.tx.send_if_modified(|status| {
            if self.current.load(Ordering::Relaxed) != claim.0 {
                return false;
            }
            self.current.store(0, Ordering::Relaxed);
            status.assignment = Assignment::Idle;
            true
        })
    }

    /// A consistent copy of the current status.
    pub fn snapshot(&self) -> WorkerStatus {
        self.tx.borrow().clone()
    }

    pub fn is_assigned(&self) -> bool {
        self.tx.borrow().is_assigned()
    }

    /// Watch every transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<WorkerStatus> {
        self.tx.subscribe()
    }

    pub fn pod_id(&self) -> String {
        self.tx.borrow().pod_id.clone()
    }
}
