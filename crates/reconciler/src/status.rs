//! Writing observed state back to a Solver.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use solver_api::{Resource, Solver, SolverPhase, SolverStatus};
use solver_store::{ObjectStore, StoreError};
use tracing::{debug, info, warn};

/// Source of timestamps for status fields.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A status mutation the reconciler wants persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The Job exists and has not succeeded. `failed` mirrors the Job's
    /// failed pod count.
    Running { failed: u32 },
    /// The Job succeeded.
    Completed,
}

impl StatusUpdate {
    /// Apply the mutation to `status`.
    ///
    /// The phase only moves forward and a `Completed` status is left
    /// untouched. Timestamps are set once and never overwritten.
    pub fn apply(self, status: &mut SolverStatus, now: DateTime<Utc>) {
        if status.phase.is_terminal() {
            return;
        }
        status.start_time.get_or_insert(now);
        match self {
            Self::Running { failed } => {
                status.phase = status.phase.max(SolverPhase::Running);
                status.active = 1;
                status.failed = failed;
            }
            Self::Completed => {
                status.phase = SolverPhase::Completed;
                status.active = 0;
                status.succeeded = 1;
                status.completion_time.get_or_insert(now);
            }
        }
    }
}

/// Persists status mutations through the status subresource.
pub struct StatusUpdater {
    store: Arc<dyn ObjectStore<Solver>>,
    clock: Arc<dyn Clock>,
}

impl StatusUpdater {
    pub fn new(store: Arc<dyn ObjectStore<Solver>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply `update` to the in-memory `solver` and write it if anything
    /// changed.
    ///
    /// On success `solver` holds the stored object, including its new
    /// resource version. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Store errors are returned unchanged, so a stale read surfaces as
    /// [`StoreError::Conflict`]. `solver` is left unmodified on error.
    pub async fn update(&self, solver: &mut Solver, update: StatusUpdate) -> Result<bool, StoreError> {
        let mut next = solver.status.clone();
        update.apply(&mut next, self.clock.now());

        if next == solver.status {
            debug!(solver = %solver.key(), phase = %solver.phase(), "Status already current");
            return Ok(false);
        }

        let from = solver.phase();
        let mut candidate = solver.clone();
        candidate.status = next;

        match self.store.update_status(candidate).await {
            Ok(written) => {
                if written.phase() == from {
                    debug!(solver = %written.key(), phase = %from, "Updated status");
                } else {
                    info!(
                        solver = %written.key(),
                        from = %from,
                        to = %written.phase(),
                        "Solver phase changed"
                    );
                }
                *solver = written;
                Ok(true)
            }
            Err(e) => {
                warn!(solver = %solver.key(), error = %e, "Failed to update status");
                Err(e)
            }
        }
    }
}
