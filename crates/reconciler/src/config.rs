//! Configuration for the reconciler and its controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use solver_api::PullPolicy;

use crate::error::{Error, Result};

/// Operator-level settings for the Jobs created on behalf of Solvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTemplate {
    /// Name of the single container in the Job's pod.
    pub container_name: String,
    /// Container image running the solver.
    pub image: String,
    /// Pull policy for the container image.
    pub image_pull_policy: PullPolicy,
    /// Command executed in the container.
    pub command: Vec<String>,
    /// Solver identity passed to the container (e.g. "solver-f27").
    pub solver_name: String,
    /// Whether the solver logs verbosely.
    pub log_solver: bool,
}

impl Default for JobTemplate {
    fn default() -> Self {
        Self {
            container_name: "solver".to_string(),
            image: "busybox".to_string(),
            image_pull_policy: PullPolicy::Always,
            command: vec!["env".to_string()],
            solver_name: "solver-f27".to_string(),
            log_solver: true,
        }
    }
}

impl JobTemplate {
    /// Check that the template can produce a runnable Job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the image, container name or
    /// solver name is blank.
    pub fn validate(&self) -> Result<()> {
        [
            ("job.image", &self.image),
            ("job.container_name", &self.container_name),
            ("job.solver_name", &self.solver_name),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map_or(Ok(()), |(key, _)| {
            Err(Error::invalid_config(format!("{key} must not be empty")))
        })
    }
}

/// Settings for the work queue and worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of concurrent reconcile workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Initial delay before retrying a failed key.
    #[serde(
        rename = "backoff_base_ms",
        with = "duration_millis",
        default = "default_backoff_base"
    )]
    pub backoff_base: Duration,

    /// Upper bound for the retry delay.
    #[serde(
        rename = "backoff_max_secs",
        with = "duration_secs",
        default = "default_backoff_max"
    )]
    pub backoff_max: Duration,

    /// Re-enqueue every Solver on this period, if set.
    #[serde(
        rename = "resync_interval_secs",
        with = "option_duration_secs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resync_interval: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backoff_base: default_backoff_base(),
            backoff_max: default_backoff_max(),
            resync_interval: None,
        }
    }
}

impl ControllerConfig {
    /// Set the worker count.
    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the retry backoff bounds.
    #[must_use]
    pub const fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Set the periodic resync interval.
    #[must_use]
    pub const fn resync_every(mut self, interval: Duration) -> Self {
        self.resync_interval = Some(interval);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero worker count, a zero
    /// backoff base, a base above the max, or a zero resync interval.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_config("controller.workers must be at least 1"));
        }
        if self.backoff_base.is_zero() {
            return Err(Error::invalid_config(
                "controller.backoff_base_ms must be greater than zero",
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(Error::invalid_config(
                "controller.backoff_base_ms must not exceed controller.backoff_max_secs",
            ));
        }
        if self.resync_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::invalid_config(
                "controller.resync_interval_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

const fn default_workers() -> usize {
    2
}

const fn default_backoff_base() -> Duration {
    Duration::from_millis(100)
}

const fn default_backoff_max() -> Duration {
    Duration::from_secs(300)
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
