//! K8s-style reconciliation of Solver resources.
//!
//! A Solver asks for a set of packages to be resolved. This crate turns
//! each Solver into a Job that runs the solver container, follows the
//! Job until it succeeds, and records progress on the Solver's status.
//!
//! # Key Concepts
//!
//! ## Reconciliation
//!
//! [`Reconciler::reconcile`] is level-triggered: it reads the Solver and
//! its Job fresh on every call and takes the one step that moves the
//! Solver forward:
//!
//! | Solver | Job | Action |
//! |---|---|---|
//! | missing | any | nothing |
//! | Completed | any | nothing |
//! | other, success recorded | missing | mark Completed |
//! | other | missing | create Job, mark Running |
//! | other | not succeeded | mark Running |
//! | other | succeeded | mark Completed, then delete Job unless `keepJob` |
//!
//! ## Controller
//!
//! [`Controller`] feeds keys from store watches into a deduplicating
//! [`WorkQueue`] and runs a pool of workers over it. Failed keys are
//! retried with exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use solver_api::{Job, Scheme, Solver};
//! use solver_reconciler::{Controller, ControllerConfig, ReconcilerBuilder};
//! use solver_store::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> solver_reconciler::Result<()> {
//!     let reconciler = ReconcilerBuilder::new()
//!         .with_solvers(InMemoryStore::<Solver>::new_arc())
//!         .with_jobs(InMemoryStore::<Job>::new_arc())
//!         .with_scheme(Scheme::new().with::<Solver>().with::<Job>())
//!         .build()?;
//!
//!     let controller = Controller::new(Arc::new(reconciler), ControllerConfig::default())?;
//!     controller.run().await
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod controller;
pub mod error;
pub mod job;
pub mod owner;
pub mod queue;
pub mod reconciler;
pub mod status;
pub mod types;

// Re-export main types
pub use config::{ControllerConfig, JobTemplate};
pub use controller::{Controller, ControllerStopper};
pub use error::{Error, Result};
pub use job::{build_job, job_key, job_name};
pub use owner::set_controller_reference;
pub use queue::WorkQueue;
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use status::{Clock, FixedClock, StatusUpdate, StatusUpdater, SystemClock};
pub use types::{ReconcileAction, ReconcileResult};
