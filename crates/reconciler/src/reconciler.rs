//! Reconciler implementation.

use std::sync::Arc;

use solver_api::{Job, ObjectKey, Resource, Scheme, Solver};
use solver_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::config::JobTemplate;
use crate::error::{Error, Result};
use crate::job::{build_job, job_key};
use crate::owner::set_controller_reference;
use crate::status::{Clock, StatusUpdate, StatusUpdater, SystemClock};
use crate::types::{ReconcileAction, ReconcileResult};

/// K8s-style reconciler driving a Solver to completion through a Job.
///
/// Each call to [`reconcile`](Self::reconcile) reads the current state
/// fresh from the stores, so passes are idempotent and may be repeated
/// any number of times.
pub struct Reconciler {
    solvers: Arc<dyn ObjectStore<Solver>>,
    jobs: Arc<dyn ObjectStore<Job>>,
    scheme: Scheme,
    template: JobTemplate,
    status: StatusUpdater,
}

impl Reconciler {
    /// Store holding Solvers.
    pub fn solvers(&self) -> &Arc<dyn ObjectStore<Solver>> {
        &self.solvers
    }

    /// Store holding Jobs.
    pub fn jobs(&self) -> &Arc<dyn ObjectStore<Job>> {
        &self.jobs
    }

    /// Template applied to every Job.
    pub const fn template(&self) -> &JobTemplate {
        &self.template
    }

    /// Bring the Solver at `key` one step closer to Completed.
    ///
    /// # Errors
    ///
    /// Any error means the pass should be retried: store failures and
    /// conflicts, ownership failures, and a Job name already taken by an
    /// object this Solver does not control.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileResult> {
        debug!(solver = %key, "Reconciling Solver");

        let mut solver = match self.solvers.get(key).await {
            Ok(solver) => solver,
            Err(e) if e.is_not_found() => {
                debug!(solver = %key, "Solver not found, owned objects are garbage collected");
                return Ok(ReconcileResult::done(ReconcileAction::ResourceGone));
            }
            Err(e) => return Err(e.into()),
        };

        if solver.phase().is_terminal() {
            debug!(solver = %key, "Solver already completed");
            return Ok(ReconcileResult::done(ReconcileAction::AlreadyCompleted));
        }

        let mut desired = build_job(&solver, &self.template);
        set_controller_reference(&solver, &mut desired, &self.scheme)?;
        let job_key = desired.key();

        let job = match self.jobs.get(&job_key).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() && solver.status.succeeded > 0 => {
                debug!(solver = %key, job = %job_key, "Success already recorded, not recreating Job");
                return self.complete(&mut solver, None).await;
            }
            Err(e) if e.is_not_found() => return self.create_job(&mut solver, desired).await,
            Err(e) => return Err(e.into()),
        };

        ensure_controlled(&solver, &job)?;

        if job.status.is_succeeded() {
            return self.complete(&mut solver, Some(&job)).await;
        }

        if job.status.is_failed() {
            warn!(
                solver = %key,
                job = %job_key,
                failed = job.status.failed,
                "Job has failed pods, waiting for it to succeed"
            );
        }

        self.status
            .update(
                &mut solver,
                StatusUpdate::Running {
                    failed: job.status.failed,
                },
            )
            .await?;
        Ok(ReconcileResult::done(ReconcileAction::JobRunning))
    }

    async fn create_job(&self, solver: &mut Solver, job: Job) -> Result<ReconcileResult> {
        let job_key = job.key();
        match self.jobs.create(job).await {
            Ok(created) => {
                info!(
                    solver = %solver.key(),
                    job = %created.key(),
                    packages = %solver.spec.packages,
                    "Created Job"
                );
            }
            Err(e) if e.is_already_exists() => {
                warn!(solver = %solver.key(), job = %job_key, "Job already exists, treating as created");
                let existing = self.jobs.get(&job_key).await?;
                ensure_controlled(solver, &existing)?;
            }
            Err(e) => return Err(e.into()),
        }

        self.status
            .update(solver, StatusUpdate::Running { failed: 0 })
            .await?;
        Ok(ReconcileResult::done(ReconcileAction::CreatedJob))
    }

    /// Persist `Completed`, then remove the Job unless it is kept.
    ///
    /// Success is recorded before the Job goes away. A pass that loses the
    /// status write to a concurrent writer leaves the Job in place, so the
    /// retry finds it succeeded instead of starting the solve again.
    async fn complete(&self, solver: &mut Solver, job: Option<&Job>) -> Result<ReconcileResult> {
        let job_key = job_key(solver);
        info!(
            solver = %solver.key(),
            job = %job_key,
            packages = %solver.spec.packages,
            "Job succeeded"
        );

        self.status.update(solver, StatusUpdate::Completed).await?;

        if job.is_none() {
            return Ok(ReconcileResult::done(ReconcileAction::Completed { job_deleted: false }));
        }
        if solver.spec.keep_job {
            debug!(job = %job_key, "Keeping Job");
            return Ok(ReconcileResult::done(ReconcileAction::Completed { job_deleted: false }));
        }

        match self.jobs.delete(&job_key).await {
            Ok(_) => info!(job = %job_key, "Deleted Job"),
            Err(e) if e.is_not_found() => debug!(job = %job_key, "Job already gone"),
            Err(e) => {
                warn!(job = %job_key, error = %e, "Solver completed but its Job was not deleted");
                return Err(e.into());
            }
        }
        Ok(ReconcileResult::done(ReconcileAction::Completed { job_deleted: true }))
    }
}

/// Fail unless `job` is controlled by `solver`.
fn ensure_controlled(solver: &Solver, job: &Job) -> Result<()> {
    let owner_uid = solver.metadata.uid.as_deref().unwrap_or_default();
    if job.metadata.is_controlled_by(owner_uid) {
        return Ok(());
    }
    warn!(
        solver = %solver.key(),
        job = %job.key(),
        "Job name is taken by an object this Solver does not control"
    );
    Err(Error::job_not_owned(job.key(), owner_uid))
}

/// Builder for creating reconcilers.
pub struct ReconcilerBuilder {
    solvers: Option<Arc<dyn ObjectStore<Solver>>>,
    jobs: Option<Arc<dyn ObjectStore<Job>>>,
    scheme: Option<Scheme>,
    template: JobTemplate,
    clock: Arc<dyn Clock>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            solvers: None,
            jobs: None,
            scheme: None,
            template: JobTemplate::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the Solver store.
    #[must_use]
    pub fn with_solvers(mut self, solvers: Arc<dyn ObjectStore<Solver>>) -> Self {
        self.solvers = Some(solvers);
        self
    }

    /// Set the Job store.
    #[must_use]
    pub fn with_jobs(mut self, jobs: Arc<dyn ObjectStore<Job>>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Set the scheme used to express ownership.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Set the Job template.
    #[must_use]
    pub fn with_template(mut self, template: JobTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the clock used for status timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a store is missing or the
    /// template is invalid, and [`Error::Ownership`] if the scheme does
    /// not know Solvers or Jobs.
    pub fn build(self) -> Result<Reconciler> {
        let solvers = self
            .solvers
            .ok_or_else(|| Error::invalid_config("Solver store is required"))?;
        let jobs = self
            .jobs
            .ok_or_else(|| Error::invalid_config("Job store is required"))?;
        let scheme = self
            .scheme
            .unwrap_or_else(|| Scheme::new().with::<Solver>().with::<Job>());

        scheme.gvk_for::<Solver>()?;
        scheme.gvk_for::<Job>()?;
        self.template.validate()?;

        Ok(Reconciler {
            status: StatusUpdater::new(Arc::clone(&solvers), self.clock),
            solvers,
            jobs,
            scheme,
            template: self.template,
        })
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use solver_api::{SchemeError, SolverPhase, SolverSpec};
    use solver_store::InMemoryStore;

    use super::*;

    struct Fixture {
        solvers: Arc<InMemoryStore<Solver>>,
        jobs: Arc<InMemoryStore<Job>>,
        reconciler: Reconciler,
    }

    fn fixture() -> Fixture {
        let solvers = InMemoryStore::<Solver>::new_arc();
        let jobs = InMemoryStore::<Job>::new_arc();
        let reconciler = ReconcilerBuilder::new()
            .with_solvers(solvers.clone())
            .with_jobs(jobs.clone())
            .build()
            .unwrap();
        Fixture {
            solvers,
            jobs,
            reconciler,
        }
    }

    #[test]
    fn test_builder_requires_stores() {
        let result = ReconcilerBuilder::new().build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder_rejects_scheme_without_solver() {
        let result = ReconcilerBuilder::new()
            .with_solvers(InMemoryStore::<Solver>::new_arc())
            .with_jobs(InMemoryStore::<Job>::new_arc())
            .with_scheme(Scheme::new().with::<Job>())
            .build();
        assert!(matches!(
            result,
            Err(Error::Ownership(SchemeError::NotRegistered { .. }))
        ));
    }

    #[tokio::test]
    async fn test_first_pass_creates_job_and_marks_running() {
        let f = fixture();
        let solver = f
            .solvers
            .create(Solver::new("thoth", "numpy", SolverSpec::new("numpy")))
            .await
            .unwrap();

        let result = f.reconciler.reconcile(&solver.key()).await.unwrap();

        assert_eq!(result, ReconcileResult::done(ReconcileAction::CreatedJob));
        let job = f.jobs.get(&job_key(&solver)).await.unwrap();
        assert!(job.metadata.is_controlled_by(solver.metadata.uid.as_deref().unwrap()));
        let stored = f.solvers.get(&solver.key()).await.unwrap();
        assert_eq!(stored.phase(), SolverPhase::Running);
        assert!(stored.status.start_time.is_some());
    }

    #[tokio::test]
    async fn test_missing_solver_is_noop() {
        let f = fixture();
        let result = f
            .reconciler
            .reconcile(&ObjectKey::new("thoth", "ghost"))
            .await
            .unwrap();
        assert_eq!(result.action, ReconcileAction::ResourceGone);
        assert!(f.jobs.is_empty().await);
    }
}
