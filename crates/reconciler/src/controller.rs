//! Drives the [`Reconciler`] from store events.
//!
//! Solver events enqueue the Solver's own key. Job events enqueue the key
//! of the Solver that controls the Job. A lagged watch, the optional
//! resync timer, and start-up all relist every Solver. A fixed pool of
//! workers drains the [`WorkQueue`]; failed keys are retried with backoff.

use std::sync::Arc;

use solver_api::{Job, ObjectKey, Resource, Solver};
use solver_store::{ObjectStore, StoreError, WatchError, WatchStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;

/// Handle for stopping a running [`Controller`].
#[derive(Clone)]
pub struct ControllerStopper {
    tx: watch::Sender<bool>,
}

impl ControllerStopper {
    /// Ask the controller to stop. Workers finish their current key first.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Event-driven controller for Solvers.
pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    config: ControllerConfig,
    stop_tx: watch::Sender<bool>,
}

impl Controller {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
    /// `config` does not validate.
    pub fn new(reconciler: Arc<Reconciler>, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            queue: Arc::new(WorkQueue::new(config.backoff_base, config.backoff_max)),
            reconciler,
            config,
            stop_tx,
        })
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> ControllerStopper {
        ControllerStopper {
            tx: self.stop_tx.clone(),
        }
    }

    /// The controller's work queue.
    pub const fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run until stopped.
    ///
    /// # Errors
    ///
    /// Fails only if the initial listing of Solvers fails. Errors after
    /// start-up are logged and retried.
    pub async fn run(&self) -> Result<()> {
        let stop = self.stop_tx.subscribe();
        let solvers = Arc::clone(self.reconciler.solvers());

        // Subscribe before listing so no change falls between the two.
        let solver_events = solvers.watch();
        let job_events = self.reconciler.jobs().watch();

        let initial = enqueue_all(solvers.as_ref(), &self.queue).await?;
        info!(
            workers = self.config.workers,
            solvers = initial,
            "Starting Solver controller"
        );

        let mut sources = JoinSet::new();
        sources.spawn(watch_solvers(
            solver_events,
            Arc::clone(&solvers),
            Arc::clone(&self.queue),
            stop.clone(),
        ));
        sources.spawn(watch_jobs(
            job_events,
            Arc::clone(&solvers),
            Arc::clone(&self.queue),
            stop.clone(),
        ));
        if let Some(period) = self.config.resync_interval {
            sources.spawn(resync(
                period,
                Arc::clone(&solvers),
                Arc::clone(&self.queue),
                stop.clone(),
            ));
        }

        let mut workers = JoinSet::new();
        for id in 0..self.config.workers {
            workers.spawn(worker(
                id,
                Arc::clone(&self.reconciler),
                Arc::clone(&self.queue),
            ));
        }

        wait_for_stop(stop).await;
        info!("Stopping Solver controller");

        self.queue.shutdown().await;
        while let Some(joined) = sources.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Event source task failed");
            }
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed");
            }
        }

        info!("Solver controller stopped");
        Ok(())
    }
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return true;
    }
    stop.changed().await.is_err() || *stop.borrow()
}

/// Key of the Solver controlling `job`, if any.
fn owner_key(job: &Job) -> Option<ObjectKey> {
    job.metadata
        .controller_ref()
        .filter(|r| r.kind == Solver::KIND)
        .map(|r| ObjectKey::new(job.metadata.namespace.clone(), r.name.clone()))
}

async fn enqueue_all(
    solvers: &dyn ObjectStore<Solver>,
    queue: &WorkQueue,
) -> std::result::Result<usize, StoreError> {
    let all = solvers.list(None).await?;
    let count = all.len();
    for solver in all {
        queue.add(solver.key()).await;
    }
    Ok(count)
}

async fn relist(solvers: &dyn ObjectStore<Solver>, queue: &WorkQueue) {
    match enqueue_all(solvers, queue).await {
        Ok(count) => debug!(solvers = count, "Relisted Solvers"),
        Err(e) => error!(error = %e, "Failed to relist Solvers"),
    }
}

async fn watch_solvers(
    mut events: WatchStream<Solver>,
    solvers: Arc<dyn ObjectStore<Solver>>,
    queue: Arc<WorkQueue>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    debug!(solver = %event.object().key(), event = event.event_type(), "Solver event");
                    queue.add(event.object().key()).await;
                }
                Err(WatchError::Lagged(missed)) => {
                    warn!(missed, "Solver watch lagged, relisting");
                    relist(solvers.as_ref(), &queue).await;
                }
                Err(WatchError::Closed) => {
                    debug!("Solver watch closed");
                    return;
                }
            },
            done = stopped(&mut stop) => if done { return },
        }
    }
}

async fn watch_jobs(
    mut events: WatchStream<Job>,
    solvers: Arc<dyn ObjectStore<Solver>>,
    queue: Arc<WorkQueue>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(owner) = owner_key(event.object()) {
                        debug!(job = %event.object().key(), solver = %owner, event = event.event_type(), "Job event");
                        queue.add(owner).await;
                    }
                }
                Err(WatchError::Lagged(missed)) => {
                    warn!(missed, "Job watch lagged, relisting Solvers");
                    relist(solvers.as_ref(), &queue).await;
                }
                Err(WatchError::Closed) => {
                    debug!("Job watch closed");
                    return;
                }
            },
            done = stopped(&mut stop) => if done { return },
        }
    }
}

async fn resync(
    period: std::time::Duration,
    solvers: Arc<dyn ObjectStore<Solver>>,
    queue: Arc<WorkQueue>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately and start-up already listed.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => relist(solvers.as_ref(), &queue).await,
            done = stopped(&mut stop) => if done { return },
        }
    }
}

async fn worker(id: usize, reconciler: Arc<Reconciler>, queue: Arc<WorkQueue>) {
    debug!(worker = id, "Worker started");
    while let Some(key) = queue.get().await {
        match reconciler.reconcile(&key).await {
            Ok(result) if result.requeue => {
                let delay = queue.add_rate_limited(key.clone()).await;
                debug!(worker = id, solver = %key, action = %result.action, retry_in_ms = delay.as_millis(), "Requeued");
            }
            Ok(result) => {
                debug!(worker = id, solver = %key, action = %result.action, "Reconciled");
                queue.forget(&key).await;
            }
            Err(e) => {
                let delay = queue.add_rate_limited(key.clone()).await;
                let attempts = queue.num_requeues(&key).await;
                if e.is_conflict() {
                    debug!(worker = id, solver = %key, error = %e, "Conflict, retrying with a fresh read");
                } else {
                    error!(
                        worker = id,
                        solver = %key,
                        error = %e,
                        attempts,
                        retry_in_ms = delay.as_millis(),
                        "Reconciliation failed, requeueing"
                    );
                }
            }
        }
        queue.done(&key).await;
    }
    debug!(worker = id, "Worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use solver_api::{ObjectMeta, OwnerReference};

    use super::*;

    fn owned_by(kind: &str, controller: bool) -> Job {
        let mut metadata = ObjectMeta::new("thoth", "numpy-job");
        metadata.owner_references.push(OwnerReference {
            api_version: "thoth-station.ninja/v1alpha1".to_string(),
            kind: kind.to_string(),
            name: "numpy".to_string(),
            uid: "uid-1".to_string(),
            controller,
            block_owner_deletion: true,
        });
        Job {
            metadata,
            ..Job::default()
        }
    }

    #[test]
    fn test_owner_key_maps_job_to_solver() {
        assert_eq!(
            owner_key(&owned_by("Solver", true)),
            Some(ObjectKey::new("thoth", "numpy"))
        );
    }

    #[test]
    fn test_owner_key_ignores_other_owners() {
        assert_eq!(owner_key(&owned_by("CronJob", true)), None);
        assert_eq!(owner_key(&owned_by("Solver", false)), None);
        assert_eq!(owner_key(&Job::default()), None);
    }
}
