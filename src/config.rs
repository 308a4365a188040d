//! Operator configuration.
//!
//! Values are layered: built-in defaults, then the config file, then
//! environment variables, then command-line flags.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solver_core::ResultExt;
use solver_core::config::{env_override, load_file};
use solver_reconciler::{ControllerConfig, JobTemplate};
use thiserror::Error;
use tracing::error;

/// Worker count override.
pub const ENV_WORKERS: &str = "SOLVER_OPERATOR_WORKERS";
/// Solver image override.
pub const ENV_IMAGE: &str = "SOLVER_OPERATOR_IMAGE";
/// Solver name override.
pub const ENV_SOLVER: &str = "SOLVER_OPERATOR_SOLVER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] solver_core::Error),

    #[error(transparent)]
    Invalid(#[from] solver_reconciler::Error),
}

/// Complete operator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub controller: ControllerConfig,
    pub job: JobTemplate,
}

/// Individual settings that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub workers: Option<usize>,
    pub image: Option<String>,
    pub solver_name: Option<String>,
}

impl Overrides {
    /// Read overrides from `SOLVER_OPERATOR_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            workers: env_override(ENV_WORKERS)?,
            image: env_override(ENV_IMAGE)?,
            solver_name: env_override(ENV_SOLVER)?,
        })
    }

    /// Combine with `other`, whose values win where set.
    #[must_use]
    pub fn then(self, other: Self) -> Self {
        Self {
            workers: other.workers.or(self.workers),
            image: other.image.or(self.image),
            solver_name: other.solver_name.or(self.solver_name),
        }
    }
}

impl OperatorConfig {
    /// Load from `path`, or use defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let config = load_file::<Self>(path).inspect_error(|e| {
            error!(path = %path.display(), error = %e, "Failed to load config");
        })?;
        Ok(config)
    }

    /// Apply overrides on top of the loaded values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(workers) = overrides.workers {
            self.controller.workers = workers;
        }
        if let Some(image) = overrides.image {
            self.job.image = image;
        }
        if let Some(solver_name) = overrides.solver_name {
            self.job.solver_name = solver_name;
        }
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.job.validate()?;
        Ok(())
    }

    /// Load, layer environment and flag overrides, and validate.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be loaded, an environment variable does
    /// not parse, or the result is invalid.
    pub fn resolve(path: Option<&Path>, flags: Overrides) -> Result<Self, ConfigError> {
        let overrides = Overrides::from_env()?.then(flags);
        let config = Self::load(path)?.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(solver_core::config::to_toml(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use solver_api::PullPolicy;

    use super::*;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(OperatorConfig::load(None).unwrap(), OperatorConfig::default());
    }

    #[test]
    fn test_load_toml_file() {
        let file = write_config(
            ".toml",
            r#"
            [controller]
            workers = 6
            resync_interval_secs = 120

            [job]
            image = "quay.io/thoth-station/solver-fedora-31-py38"
            solver_name = "solver-fedora-31-py38"
            image_pull_policy = "IfNotPresent"
            "#,
        );

        let config = OperatorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.controller.workers, 6);
        assert_eq!(config.controller.resync_interval, Some(Duration::from_secs(120)));
        assert_eq!(config.controller.backoff_base, Duration::from_millis(100));
        assert_eq!(config.job.solver_name, "solver-fedora-31-py38");
        assert_eq!(config.job.image_pull_policy, PullPolicy::IfNotPresent);
        assert_eq!(config.job.command, vec!["env"]);
    }

    #[test]
    fn test_load_json_file() {
        let file = write_config(".json", r#"{"job": {"log_solver": false}}"#);
        let config = OperatorConfig::load(Some(file.path())).unwrap();
        assert!(!config.job.log_solver);
        assert_eq!(config.controller, ControllerConfig::default());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = OperatorConfig::load(Some(Path::new("/nonexistent/operator.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_later_overrides_win() {
        let env = Overrides {
            workers: Some(3),
            image: Some("env-image".to_string()),
            solver_name: None,
        };
        let flags = Overrides {
            workers: Some(5),
            ..Overrides::default()
        };

        let config = OperatorConfig::default().with_overrides(env.then(flags));

        assert_eq!(config.controller.workers, 5);
        assert_eq!(config.job.image, "env-image");
        assert_eq!(config.job.solver_name, "solver-f27");
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = OperatorConfig::default().with_overrides(Overrides {
            workers: Some(0),
            ..Overrides::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_output_loads_back() {
        let config = OperatorConfig::default().with_overrides(Overrides {
            workers: Some(4),
            ..Overrides::default()
        });
        let file = write_config(".toml", &config.to_toml().unwrap());
        assert_eq!(OperatorConfig::load(Some(file.path())).unwrap(), config);
    }
}
