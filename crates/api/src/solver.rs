//! The Solver resource.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::ResourceRequirements;
use crate::meta::{ObjectMeta, Resource};

/// Lifecycle phase of a Solver.
///
/// Phases only move forward: `Initializing -> Running -> Completed`.
/// The derived ordering follows declaration order and is the progression.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SolverPhase {
    /// No phase recorded yet. An empty phase string reads as this.
    #[default]
    #[serde(alias = "")]
    Initializing,
    /// A job has been created for this Solver.
    Running,
    /// The job succeeded. Terminal.
    Completed,
}

impl SolverPhase {
    /// Check if this is a terminal phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if moving to `target` keeps the progression forward-only.
    ///
    /// Staying in the same phase is allowed; re-running a reconcile must not fail.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        target >= self
    }
}

impl fmt::Display for SolverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Completed => "Completed",
        };
        write!(f, "{s}")
    }
}

/// Policy applied to the pods of the Solver's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodPolicy {
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Desired state of a Solver. Not updated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<PodPolicy>,
    /// The package requirements to resolve.
    pub packages: String,
    /// Also solve transitive dependencies.
    #[serde(default)]
    pub include_transitive: bool,
    /// Where the solver writes its result.
    #[serde(default)]
    pub output: String,
    /// Keep the job around after it succeeded.
    #[serde(default)]
    pub keep_job: bool,
}

impl SolverSpec {
    /// Create a spec for the given package set.
    pub fn new(packages: impl Into<String>) -> Self {
        Self {
            packages: packages.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_include_transitive(mut self, include: bool) -> Self {
        self.include_transitive = include;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    #[must_use]
    pub const fn with_keep_job(mut self, keep: bool) -> Self {
        self.keep_job = keep;
        self
    }

    #[must_use]
    pub fn with_pod_policy(mut self, pod: PodPolicy) -> Self {
        self.pod = Some(pod);
        self
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Observed state of a Solver, owned by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverStatus {
    #[serde(default)]
    pub phase: SolverPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub active: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failed: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub succeeded: u32,
}

/// A dependency-resolution task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solver {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: SolverSpec,
    #[serde(default)]
    pub status: SolverStatus,
}

impl Solver {
    /// Create a Solver that has not been persisted yet.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: SolverSpec) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: SolverStatus::default(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SolverPhase {
        self.status.phase
    }
}

impl Resource for Solver {
    const API_VERSION: &'static str = "thoth-station.ninja/v1alpha1";
    const KIND: &'static str = "Solver";

    type Status = SolverStatus;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn status(&self) -> &SolverStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SolverStatus {
        &mut self.status
    }
}
