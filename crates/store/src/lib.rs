//! Versioned object storage for the solver operator.
//!
//! - **Store**: [`ObjectStore`] is the get/list/create/update/delete/watch
//!   contract; [`InMemoryStore`] implements it with optimistic concurrency
//! - **Watch**: every write is broadcast as a [`WatchEvent`]
//! - **Garbage collection**: [`GarbageCollector`] deletes dependents whose
//!   owner is gone
//!
//! # Example
//!
//! ```ignore
//! use solver_api::{Solver, SolverSpec};
//! use solver_store::{InMemoryStore, ObjectStore};
//!
//! let store = InMemoryStore::<Solver>::new();
//! let mut watch = store.watch();
//!
//! let created = store
//!     .create(Solver::new("thoth", "numpy", SolverSpec::new("numpy==1.0")))
//!     .await?;
//! let event = watch.recv().await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod gc;
pub mod store;
pub mod watch;

pub use error::{Result, StoreError};
pub use gc::GarbageCollector;
pub use store::{InMemoryStore, ObjectStore, TracingStore};
pub use watch::{WatchError, WatchEvent, WatchStream};
