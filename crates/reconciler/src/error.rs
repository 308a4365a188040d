//! Error types for the reconciler crate.

use solver_api::{ObjectKey, SchemeError};
use solver_store::StoreError;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
///
/// Every variant is retryable from the controller's point of view; the key
/// is re-queued with backoff.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A read or write against the object store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An ownership link could not be established.
    #[error("ownership error: {0}")]
    Ownership(#[from] SchemeError),

    /// A Job with the derived name exists but belongs to someone else.
    #[error("job '{job}' exists but is not controlled by solver uid '{owner_uid}'")]
    JobNotOwned { job: ObjectKey, owner_uid: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a job-not-owned error.
    pub fn job_not_owned(job: ObjectKey, owner_uid: impl Into<String>) -> Self {
        Self::JobNotOwned {
            job,
            owner_uid: owner_uid.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error is an optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}
