//! Object store trait and implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use solver_api::{ObjectKey, Resource};
use tokio::sync::{RwLock, broadcast};
use ulid::Ulid;

use crate::error::{Result, StoreError};
use crate::watch::{WatchEvent, WatchStream};

/// Default capacity of the watch broadcast channel.
const WATCH_CAPACITY: usize = 1024;

/// Trait for object storage backends.
///
/// Writes carry the `resource_version` the caller last read; a mismatch
/// with the stored version is a [`StoreError::Conflict`] and the stored
/// object is left untouched. A missing version makes the write unconditional.
#[async_trait]
pub trait ObjectStore<K: Resource>: Send + Sync {
    /// Fetch an object by key.
    async fn get(&self, key: &ObjectKey) -> Result<K>;

    /// List objects, optionally restricted to one namespace.
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>>;

    /// Persist a new object. The store assigns uid, version and creation time.
    async fn create(&self, object: K) -> Result<K>;

    /// Replace metadata and spec. The stored status is kept.
    async fn update(&self, object: K) -> Result<K>;

    /// Replace the status. The stored metadata and spec are kept.
    async fn update_status(&self, object: K) -> Result<K>;

    /// Remove an object, returning it as it was.
    async fn delete(&self, key: &ObjectKey) -> Result<K>;

    /// Subscribe to changes made after this call.
    fn watch(&self) -> WatchStream<K>;
}

struct Inner<K> {
    objects: HashMap<ObjectKey, K>,
    version: u64,
}

impl<K: Resource> Inner<K> {
    fn next_version(&mut self) -> String {
        self.version = self.version.saturating_add(1);
        self.version.to_string()
    }

    fn stored(&self, key: &ObjectKey) -> Result<&K> {
        self.objects
            .get(key)
            .ok_or_else(|| StoreError::not_found(K::KIND, key.clone()))
    }

    fn check_version(&self, object: &K) -> Result<()> {
        let key = object.key();
        let stored = self.stored(&key)?;
        let actual = stored.metadata().resource_version.clone().unwrap_or_default();

        match object.metadata().resource_version.as_deref() {
            Some(expected) if expected != actual => {
                Err(StoreError::conflict(K::KIND, key, expected, actual))
            }
            _ => Ok(()),
        }
    }
}

/// In-memory object store.
///
/// Resource versions come from a single counter, so they increase across
/// all objects in the store.
pub struct InMemoryStore<K: Resource> {
    inner: RwLock<Inner<K>>,
    events: broadcast::Sender<WatchEvent<K>>,
}

impl<K: Resource> Default for InMemoryStore<K> {
    fn default() -> Self {
        Self::with_watch_capacity(WATCH_CAPACITY)
    }
}

impl<K: Resource> InMemoryStore<K> {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory store wrapped in an Arc.
    #[must_use]
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create a store whose watchers lag after `capacity` unread events.
    #[must_use]
    pub fn with_watch_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: RwLock::new(Inner {
                objects: HashMap::new(),
                version: 0,
            }),
            events,
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.objects.is_empty()
    }

    // Sent while the write lock is held so watchers see versions in order.
    fn notify(&self, event: WatchEvent<K>) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl<K: Resource> ObjectStore<K> for InMemoryStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<K> {
        self.inner.read().await.stored(key).cloned()
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .filter(|o| namespace.is_none_or(|ns| o.metadata().namespace == ns))
            .cloned()
            .sorted_by_key(|o| o.key())
            .collect_vec())
    }

    async fn create(&self, mut object: K) -> Result<K> {
        let key = object.key();
        if key.name.is_empty() || key.namespace.is_empty() {
            return Err(StoreError::invalid(format!(
                "{} requires both a namespace and a name, got '{key}'",
                K::KIND
            )));
        }

        let mut inner = self.inner.write().await;
        if inner.objects.contains_key(&key) {
            return Err(StoreError::already_exists(K::KIND, key));
        }

        let version = inner.next_version();
        let meta = object.metadata_mut();
        meta.uid = Some(Ulid::new().to_string());
        meta.resource_version = Some(version);
        meta.creation_timestamp = Some(Utc::now());

        inner.objects.insert(key, object.clone());
        self.notify(WatchEvent::Added(object.clone()));
        Ok(object)
    }

    async fn update(&self, mut object: K) -> Result<K> {
        let key = object.key();
        let mut inner = self.inner.write().await;
        inner.check_version(&object)?;

        let stored = inner.stored(&key)?;
        let status = stored.status().clone();
        let uid = stored.metadata().uid.clone();
        let created = stored.metadata().creation_timestamp;

        let version = inner.next_version();
        *object.status_mut() = status;
        let meta = object.metadata_mut();
        meta.uid = uid;
        meta.creation_timestamp = created;
        meta.resource_version = Some(version);

        inner.objects.insert(key, object.clone());
        self.notify(WatchEvent::Modified(object.clone()));
        Ok(object)
    }

    async fn update_status(&self, object: K) -> Result<K> {
        let key = object.key();
        let mut inner = self.inner.write().await;
        inner.check_version(&object)?;

        let mut next = inner.stored(&key)?.clone();
        *next.status_mut() = object.status().clone();
        next.metadata_mut().resource_version = Some(inner.next_version());

        inner.objects.insert(key, next.clone());
        self.notify(WatchEvent::Modified(next.clone()));
        Ok(next)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<K> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .objects
            .remove(key)
            .ok_or_else(|| StoreError::not_found(K::KIND, key.clone()))?;
        inner.next_version();

        self.notify(WatchEvent::Deleted(removed.clone()));
        Ok(removed)
    }

    fn watch(&self) -> WatchStream<K> {
        WatchStream::new(self.events.subscribe())
    }
}

/// A wrapper that adds tracing to an object store.
pub struct TracingStore<S> {
    inner: S,
}

impl<S> TracingStore<S> {
    /// Create a new tracing store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<K, S> ObjectStore<K> for TracingStore<S>
where
    K: Resource,
    S: ObjectStore<K>,
{
    async fn get(&self, key: &ObjectKey) -> Result<K> {
        tracing::debug!(kind = K::KIND, key = %key, "Getting object");
        self.inner.get(key).await
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>> {
        tracing::debug!(kind = K::KIND, namespace = ?namespace, "Listing objects");
        self.inner.list(namespace).await
    }

    async fn create(&self, object: K) -> Result<K> {
        tracing::debug!(kind = K::KIND, key = %object.key(), "Creating object");
        let result = self.inner.create(object).await;
        if let Ok(ref created) = result {
            tracing::trace!(
                uid = ?created.metadata().uid,
                version = ?created.metadata().resource_version,
                "Object created"
            );
        }
        result
    }

    async fn update(&self, object: K) -> Result<K> {
        tracing::debug!(
            kind = K::KIND,
            key = %object.key(),
            version = ?object.metadata().resource_version,
            "Updating object"
        );
        self.inner.update(object).await
    }

    async fn update_status(&self, object: K) -> Result<K> {
        tracing::debug!(
            kind = K::KIND,
            key = %object.key(),
            version = ?object.metadata().resource_version,
            "Updating object status"
        );
        self.inner.update_status(object).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<K> {
        tracing::debug!(kind = K::KIND, key = %key, "Deleting object");
        self.inner.delete(key).await
    }

    fn watch(&self) -> WatchStream<K> {
        tracing::debug!(kind = K::KIND, "Opening watch");
        self.inner.watch()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use solver_api::{Solver, SolverPhase, SolverSpec};

    use super::*;

    fn solver(name: &str) -> Solver {
        Solver::new("thoth", name, SolverSpec::new("numpy==1.0"))
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let store = InMemoryStore::new();
        let created = store.create(solver("numpy")).await.unwrap();

        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert!(created.metadata.creation_timestamp.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let store = InMemoryStore::new();
        store.create(solver("numpy")).await.unwrap();

        let err = store.create(solver("numpy")).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_without_name_is_invalid() {
        let store = InMemoryStore::new();
        let err = store.create(solver("")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store: InMemoryStore<Solver> = InMemoryStore::new();
        let err = store
            .get(&ObjectKey::new("thoth", "missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_status_keeps_spec_and_bumps_version() {
        let store = InMemoryStore::new();
        let created = store.create(solver("numpy")).await.unwrap();

        let mut changed = created.clone();
        changed.spec.packages = "ignored".to_string();
        changed.status.phase = SolverPhase::Running;

        let updated = store.update_status(changed).await.unwrap();
        assert_eq!(updated.status.phase, SolverPhase::Running);
        assert_eq!(updated.spec.packages, "numpy==1.0");
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(updated.metadata.uid, created.metadata.uid);
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_identity() {
        let store = InMemoryStore::new();
        let created = store.create(solver("numpy")).await.unwrap();

        let mut running = created.clone();
        running.status.phase = SolverPhase::Running;
        let running = store.update_status(running).await.unwrap();

        let mut relabelled = running.clone();
        relabelled
            .metadata
            .labels
            .insert("team".to_string(), "thoth".to_string());
        relabelled.metadata.uid = Some("forged".to_string());
        relabelled.status.phase = SolverPhase::Initializing;

        let updated = store.update(relabelled).await.unwrap();
        assert_eq!(updated.status.phase, SolverPhase::Running);
        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_eq!(
            updated.metadata.labels.get("team").map(String::as_str),
            Some("thoth")
        );
    }

    #[tokio::test]
    async fn test_stale_write_conflicts_and_leaves_object_intact() {
        let store = InMemoryStore::new();
        let created = store.create(solver("numpy")).await.unwrap();

        let mut first = created.clone();
        first.status.phase = SolverPhase::Running;
        store.update_status(first).await.unwrap();

        let mut stale = created.clone();
        stale.status.phase = SolverPhase::Completed;
        let err = store.update_status(stale).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        let current = store.get(&created.key()).await.unwrap();
        assert_eq!(current.status.phase, SolverPhase::Running);
        assert_eq!(current.metadata.resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_write_to_deleted_object_is_not_found() {
        let store = InMemoryStore::new();
        let created = store.create(solver("numpy")).await.unwrap();
        store.delete(&created.key()).await.unwrap();

        let err = store.update_status(created).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_namespace_and_sorts() {
        let store = InMemoryStore::new();
        store.create(solver("scipy")).await.unwrap();
        store.create(solver("numpy")).await.unwrap();
        store
            .create(Solver::new("other", "flask", SolverSpec::new("flask")))
            .await
            .unwrap();

        let thoth = store.list(Some("thoth")).await.unwrap();
        let names: Vec<_> = thoth.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["numpy", "scipy"]);
        assert_eq!(store.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_watch_sees_every_write_in_order() {
        let store = InMemoryStore::new();
        let mut watch = store.watch();

        let created = store.create(solver("numpy")).await.unwrap();
        let mut running = created.clone();
        running.status.phase = SolverPhase::Running;
        store.update_status(running).await.unwrap();
        store.delete(&created.key()).await.unwrap();

        let kinds: Vec<_> = [
            watch.recv().await.unwrap(),
            watch.recv().await.unwrap(),
            watch.recv().await.unwrap(),
        ]
        .iter()
        .map(WatchEvent::event_type)
        .collect();
        assert_eq!(kinds, vec!["added", "modified", "deleted"]);
    }

    #[tokio::test]
    async fn test_slow_watcher_reports_lag() {
        let store = InMemoryStore::with_watch_capacity(1);
        let mut watch = store.watch();

        store.create(solver("numpy")).await.unwrap();
        store.create(solver("scipy")).await.unwrap();

        assert!(matches!(
            watch.recv().await,
            Err(crate::watch::WatchError::Lagged(_))
        ));
    }

    #[tokio::test]
    async fn test_tracing_store_delegates() {
        let store = TracingStore::new(InMemoryStore::new());
        let created = store.create(solver("numpy")).await.unwrap();
        let fetched = store.get(&created.key()).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(store.inner().len().await, 1);
    }
}
