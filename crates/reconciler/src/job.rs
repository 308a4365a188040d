//! Builds the Job that runs a Solver.
//!
//! The builder is a pure function of the Solver and the operator's
//! [`JobTemplate`]: the same inputs always yield the same Job. Ownership
//! is attached separately by [`set_controller_reference`](crate::owner::set_controller_reference).

use std::collections::BTreeMap;

use solver_api::{
    Container, EnvVar, Job, JobSpec, ObjectKey, ObjectMeta, PodSpec, PodTemplateSpec,
    RestartPolicy, Solver,
};

use crate::config::JobTemplate;

/// Suffix appended to the Solver name to form its Job name.
pub const JOB_NAME_SUFFIX: &str = "-job";

/// Environment variable names understood by the solver container.
pub mod env {
    pub const SOLVER: &str = "THOTH_SOLVER";
    pub const LOG_SOLVER: &str = "THOTH_LOG_SOLVER";
    pub const NO_TRANSITIVE: &str = "THOTH_SOLVER_NO_TRANSITIVE";
    pub const PACKAGES: &str = "THOTH_SOLVER_PACKAGES";
    pub const OUTPUT: &str = "THOTH_SOLVER_OUTPUT";
}

/// Name of the Job owned by the Solver called `solver_name`.
#[must_use]
pub fn job_name(solver_name: &str) -> String {
    format!("{solver_name}{JOB_NAME_SUFFIX}")
}

/// Key of the Job owned by `solver`.
#[must_use]
pub fn job_key(solver: &Solver) -> ObjectKey {
    ObjectKey::new(
        solver.metadata.namespace.clone(),
        job_name(&solver.metadata.name),
    )
}

/// Labels put on the Job and its pod template.
#[must_use]
pub fn labels_for(solver: &Solver, template: &JobTemplate) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), "thoth".to_string()),
        ("component".to_string(), template.solver_name.clone()),
        ("solver".to_string(), solver.metadata.name.clone()),
    ])
}

fn bool_env(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Build the desired Job for `solver`.
///
/// The Job lives in the Solver's namespace, runs a single container that
/// never restarts, and receives the Solver's parameters as environment
/// variables. Resource requirements from `spec.pod` are copied onto the
/// container when present.
#[must_use]
pub fn build_job(solver: &Solver, template: &JobTemplate) -> Job {
    let spec = &solver.spec;
    let labels = labels_for(solver, template);

    let resources = spec
        .pod
        .as_ref()
        .map(|pod| pod.resources.clone())
        .filter(|r| !r.is_empty());

    let container = Container {
        name: template.container_name.clone(),
        image: template.image.clone(),
        image_pull_policy: template.image_pull_policy,
        command: template.command.clone(),
        env: vec![
            EnvVar::new(env::SOLVER, template.solver_name.clone()),
            EnvVar::new(env::LOG_SOLVER, bool_env(template.log_solver)),
            EnvVar::new(env::NO_TRANSITIVE, bool_env(!spec.include_transitive)),
            EnvVar::new(env::PACKAGES, spec.packages.clone()),
            EnvVar::new(env::OUTPUT, spec.output.clone()),
        ],
        resources,
    };

    let mut metadata = ObjectMeta::new(
        solver.metadata.namespace.clone(),
        job_name(&solver.metadata.name),
    );
    metadata.labels.clone_from(&labels);

    Job {
        metadata,
        spec: JobSpec {
            template: PodTemplateSpec {
                labels,
                spec: PodSpec {
                    containers: vec![container],
                    restart_policy: RestartPolicy::Never,
                },
            },
        },
        ..Job::default()
    }
}
