//! Concurrent writers racing on the same object through the store contract.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use solver_api::{Solver, SolverPhase, SolverSpec};
use solver_store::{InMemoryStore, ObjectStore, StoreError, TracingStore};

fn shared_store() -> Arc<dyn ObjectStore<Solver>> {
    Arc::new(TracingStore::new(InMemoryStore::<Solver>::new()))
}

/// Given many writers holding the same resource version
/// When they all write status at once
/// Then exactly one wins and the rest see a conflict
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_writer_with_a_given_version_wins() {
    let store = shared_store();
    let created = store
        .create(Solver::new("thoth", "numpy", SolverSpec::new("numpy==1.0")))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let store = Arc::clone(&store);
            let mut copy = created.clone();
            copy.status.phase = SolverPhase::Running;
            copy.status.active = i;
            tokio::spawn(async move { store.update_status(copy).await })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(StoreError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);

    let current = store.get(&created.metadata.key()).await.unwrap();
    assert_eq!(current.status.phase, SolverPhase::Running);
    assert_eq!(current.metadata.resource_version.as_deref(), Some("2"));
}

/// Given a writer that lost a race
/// When it re-reads and retries with the fresh version
/// Then the write goes through
#[tokio::test]
async fn fresh_read_after_conflict_succeeds() {
    let store = shared_store();
    let created = store
        .create(Solver::new("thoth", "numpy", SolverSpec::new("numpy==1.0")))
        .await
        .unwrap();

    let mut winner = created.clone();
    winner.status.active = 1;
    store.update_status(winner).await.unwrap();

    let mut loser = created.clone();
    loser.status.phase = SolverPhase::Running;
    let err = store.update_status(loser).await.unwrap_err();
    assert!(err.is_conflict());

    let mut fresh = store.get(&created.metadata.key()).await.unwrap();
    fresh.status.phase = SolverPhase::Running;
    let written = store.update_status(fresh).await.unwrap();

    assert_eq!(written.status.phase, SolverPhase::Running);
    assert_eq!(written.status.active, 1);
}
