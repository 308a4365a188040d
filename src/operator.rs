//! Wiring of stores, controller and garbage collector into one process.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use solver_api::{Job, Scheme, Solver};
use solver_reconciler::{Controller, ReconcilerBuilder};
use solver_store::{GarbageCollector, InMemoryStore, ObjectStore, TracingStore};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::OperatorConfig;

/// The kinds this operator works with.
#[must_use]
pub fn scheme() -> Scheme {
    Scheme::new().with::<Solver>().with::<Job>()
}

/// A fully wired operator over in-memory stores.
pub struct Operator {
    solvers: Arc<dyn ObjectStore<Solver>>,
    jobs: Arc<dyn ObjectStore<Job>>,
    controller: Arc<Controller>,
    collector: GarbageCollector<Job>,
}

impl Operator {
    /// Build every component from `config`.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid or the scheme lacks a required kind.
    pub fn new(config: &OperatorConfig) -> Result<Self> {
        let solvers: Arc<dyn ObjectStore<Solver>> =
            Arc::new(TracingStore::new(InMemoryStore::<Solver>::new()));
        let jobs: Arc<dyn ObjectStore<Job>> =
            Arc::new(TracingStore::new(InMemoryStore::<Job>::new()));

        let reconciler = ReconcilerBuilder::new()
            .with_solvers(Arc::clone(&solvers))
            .with_jobs(Arc::clone(&jobs))
            .with_scheme(scheme())
            .with_template(config.job.clone())
            .build()
            .context("Failed to build reconciler")?;

        let controller = Controller::new(Arc::new(reconciler), config.controller.clone())
            .context("Failed to build controller")?;

        Ok(Self {
            collector: GarbageCollector::new(Arc::clone(&jobs)),
            solvers,
            jobs,
            controller: Arc::new(controller),
        })
    }

    /// Store holding Solvers.
    pub fn solvers(&self) -> &Arc<dyn ObjectStore<Solver>> {
        &self.solvers
    }

    /// Store holding Jobs.
    pub fn jobs(&self) -> &Arc<dyn ObjectStore<Job>> {
        &self.jobs
    }

    /// Run the controller and garbage collector until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller fails to start.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (gc_stop, gc_stop_rx) = watch::channel(false);
        let stopper = self.controller.stopper();

        let mut controller = {
            let controller = Arc::clone(&self.controller);
            tokio::spawn(async move { controller.run().await })
        };
        let collector = {
            let solvers = Arc::clone(&self.solvers);
            let events = solvers.watch();
            let gc = self.collector;
            tokio::spawn(async move { gc.run::<Solver>(solvers.as_ref(), events, gc_stop_rx).await })
        };

        let early_exit = tokio::select! {
            () = shutdown => None,
            joined = &mut controller => Some(joined),
        };

        stopper.stop();
        gc_stop.send_replace(true);

        if let Err(e) = collector.await.context("Garbage collector task failed")? {
            warn!(error = %e, "Garbage collector stopped with an error");
        }

        let controller_result = match early_exit {
            Some(joined) => joined,
            None => controller.await,
        };
        controller_result
            .context("Controller task failed")?
            .context("Controller stopped with an error")?;

        info!("Operator stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use solver_api::{Resource, SolverPhase, SolverSpec};

    use super::*;

    #[test]
    fn test_scheme_registers_both_kinds() {
        let scheme = scheme();
        assert!(scheme.is_registered::<Solver>());
        assert!(scheme.is_registered::<Job>());
    }

    #[tokio::test]
    async fn test_run_reconciles_until_shutdown() {
        let operator = Operator::new(&OperatorConfig::default()).unwrap();
        let solvers = Arc::clone(operator.solvers());
        let jobs = Arc::clone(operator.jobs());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(operator.run(async {
            let _ = done_rx.await;
        }));

        let solver = solvers
            .create(Solver::new("thoth", "numpy", SolverSpec::new("numpy==1.0")))
            .await
            .unwrap();

        let mut phase = SolverPhase::Initializing;
        for _ in 0..200 {
            phase = solvers.get(&solver.key()).await.unwrap().phase();
            if phase == SolverPhase::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(phase, SolverPhase::Running);
        assert_eq!(jobs.list(None).await.unwrap().len(), 1);

        solvers.delete(&solver.key()).await.unwrap();
        for _ in 0..200 {
            if jobs.list(None).await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(jobs.list(None).await.unwrap().is_empty());

        done_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
    }
}
