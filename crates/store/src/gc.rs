//! Owner-based garbage collection.
//!
//! Dependents point at their owner through owner references. When an
//! owner is deleted, every dependent referencing its uid is deleted too.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use solver_api::Resource;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::store::ObjectStore;
use crate::watch::{WatchError, WatchEvent, WatchStream};

/// Delay between sweeps while a previous collection is still failing.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Deletes objects of kind `D` whose owner no longer exists.
pub struct GarbageCollector<D: Resource> {
    dependents: Arc<dyn ObjectStore<D>>,
    retry_interval: Duration,
}

impl<D: Resource> GarbageCollector<D> {
    /// Create a collector for the given dependents' store.
    pub fn new(dependents: Arc<dyn ObjectStore<D>>) -> Self {
        Self {
            dependents,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set how long to wait before sweeping again after a failure.
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Delete every dependent owned by `owner`.
    ///
    /// Returns how many dependents were deleted. Dependents that vanish
    /// while being collected are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first store error other than not-found.
    pub async fn collect<O: Resource>(&self, owner: &O) -> Result<usize> {
        let Some(uid) = owner.metadata().uid.as_deref() else {
            return Ok(0);
        };

        let candidates = self
            .dependents
            .list(Some(owner.metadata().namespace.as_str()))
            .await?;

        let mut removed = 0usize;
        for dependent in candidates
            .iter()
            .filter(|d| d.metadata().has_owner(O::KIND, uid))
        {
            if self.delete_dependent(dependent).await? {
                removed = removed.saturating_add(1);
            }
        }

        if removed > 0 {
            info!(
                owner_kind = O::KIND,
                owner = %owner.key(),
                removed,
                "Collected dependents of deleted owner"
            );
        }
        Ok(removed)
    }

    /// Delete every dependent whose `O` owner is missing from `owners`.
    ///
    /// Used to catch up after missed owner deletions.
    ///
    /// # Errors
    ///
    /// Returns the first store error other than not-found.
    pub async fn sweep<O: Resource>(&self, owners: &dyn ObjectStore<O>) -> Result<usize> {
        let live: HashSet<String> = owners
            .list(None)
            .await?
            .iter()
            .filter_map(|o| o.metadata().uid.clone())
            .collect();

        let mut removed = 0usize;
        for dependent in self.dependents.list(None).await? {
            let orphaned = dependent
                .metadata()
                .owner_references
                .iter()
                .any(|r| r.kind == O::KIND && !live.contains(&r.uid));
            if orphaned && self.delete_dependent(&dependent).await? {
                removed = removed.saturating_add(1);
            }
        }

        debug!(owner_kind = O::KIND, removed, "Garbage collection sweep finished");
        Ok(removed)
    }

    /// Collect dependents as owner deletions arrive, until `stop` flips to true.
    ///
    /// A lagged watch or a failed collection triggers a full
    /// [`sweep`](Self::sweep) against `owners`. A failed sweep is retried
    /// every retry interval until one succeeds.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; failures are logged and swept again.
    pub async fn run<O: Resource>(
        &self,
        owners: &dyn ObjectStore<O>,
        mut events: WatchStream<O>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(owner_kind = O::KIND, dependent_kind = D::KIND, "Starting garbage collector");

        let mut needs_sweep = false;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(WatchEvent::Deleted(owner)) => {
                        if let Err(e) = self.collect(&owner).await {
                            error!(owner = %owner.key(), error = %e, "Failed to collect dependents, sweeping");
                            needs_sweep = true;
                        }
                    }
                    Ok(_) => {}
                    Err(WatchError::Lagged(missed)) => {
                        warn!(missed, "Owner watch lagged, sweeping for orphans");
                        needs_sweep = true;
                    }
                    Err(WatchError::Closed) => {
                        info!("Owner watch closed, stopping garbage collector");
                        return Ok(());
                    }
                },
                () = tokio::time::sleep(self.retry_interval), if needs_sweep => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("Garbage collector stopped");
                        return Ok(());
                    }
                }
            }

            if needs_sweep {
                match self.sweep(owners).await {
                    Ok(_) => needs_sweep = false,
                    Err(e) => error!(
                        error = %e,
                        retry_in_ms = self.retry_interval.as_millis(),
                        "Garbage collection sweep failed"
                    ),
                }
            }
        }
    }

    async fn delete_dependent(&self, dependent: &D) -> Result<bool> {
        match self.dependents.delete(&dependent.key()).await {
            Ok(_) => {
                debug!(kind = D::KIND, key = %dependent.key(), "Deleted dependent");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
