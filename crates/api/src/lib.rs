//! Object model for the solver operator.
//!
//! Two kinds live here:
//!
//! - [`Solver`]: the user-facing resource declaring a dependency-resolution task
//! - [`Job`]: the delegated work unit that performs it
//!
//! Both implement [`Resource`], which is everything the store and the
//! reconciler need to know about an object. [`Scheme`] is the explicit
//! registry of kinds that may appear in owner references.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod job;
pub mod meta;
pub mod scheme;
pub mod solver;

pub use error::SchemeError;
pub use job::{
    Container, EnvVar, Job, JobSpec, JobStatus, PodSpec, PodTemplateSpec, PullPolicy,
    ResourceRequirements, RestartPolicy,
};
pub use meta::{ObjectKey, ObjectMeta, OwnerReference, Resource};
pub use scheme::{GroupVersionKind, Scheme};
pub use solver::{PodPolicy, Solver, SolverPhase, SolverSpec, SolverStatus};
