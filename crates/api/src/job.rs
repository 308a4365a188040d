//! The Job kind: the delegated work unit that runs a solver.
//!
//! Only the fields the operator sets or reads are modelled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};

/// Compute resource limits and requests, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

impl ResourceRequirements {
    /// Whether neither limits nor requests are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

/// A single environment variable passed to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// When the runtime pulls the container image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    #[default]
    Always,
    IfNotPresent,
    Never,
}

/// What happens to a pod's containers when they exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    #[default]
    Never,
}

/// A container inside the job's pod template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub image_pull_policy: PullPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl Container {
    /// Value of the environment variable `name`, if set.
    #[must_use]
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub containers: Vec<Container>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplateSpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub template: PodTemplateSpec,
}

/// Pod counts reported by the execution environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub active: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub succeeded: u32,
}

impl JobStatus {
    /// At least one pod ran to completion.
    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        self.succeeded > 0
    }

    /// Pods failed and none succeeded.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }
}

/// A run-to-completion workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
    #[serde(default)]
    pub status: JobStatus,
}

impl Job {
    /// The first container of the pod template.
    #[must_use]
    pub fn container(&self) -> Option<&Container> {
        self.spec.template.spec.containers.first()
    }
}

impl Resource for Job {
    const API_VERSION: &'static str = "batch/v1";
    const KIND: &'static str = "Job";

    type Status = JobStatus;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut JobStatus {
        &mut self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_classification() {
        let running = JobStatus {
            active: 1,
            ..JobStatus::default()
        };
        assert!(!running.is_succeeded());
        assert!(!running.is_failed());

        let failed = JobStatus {
            failed: 1,
            ..JobStatus::default()
        };
        assert!(failed.is_failed());
        assert!(!failed.is_succeeded());

        let retried = JobStatus {
            failed: 1,
            succeeded: 1,
            ..JobStatus::default()
        };
        assert!(retried.is_succeeded());
        assert!(!retried.is_failed());
    }

    #[test]
    fn test_env_value_lookup() {
        let container = Container {
            name: "solver".to_string(),
            env: vec![EnvVar::new("THOTH_SOLVER_OUTPUT", "/out")],
            ..Container::default()
        };
        assert_eq!(container.env_value("THOTH_SOLVER_OUTPUT"), Some("/out"));
        assert_eq!(container.env_value("THOTH_SOLVER_PACKAGES"), None);
    }

    #[test]
    fn test_restart_policy_defaults_to_never() {
        assert_eq!(RestartPolicy::default(), RestartPolicy::Never);
    }
}
