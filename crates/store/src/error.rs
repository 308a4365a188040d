//! Error types for store operations.

use solver_api::ObjectKey;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No object with this key.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: ObjectKey },

    /// Create of a key that is already taken.
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: String, key: ObjectKey },

    /// The write was based on a stale resource version.
    #[error("conflict writing {kind} '{key}': resource version {expected} is stale, current is {actual}")]
    Conflict {
        kind: String,
        key: ObjectKey,
        expected: String,
        actual: String,
    },

    /// The object was rejected before being stored.
    #[error("invalid object: {reason}")]
    Invalid { reason: String },

    /// The backend could not be reached.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(kind: impl Into<String>, key: ObjectKey) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key,
        }
    }

    /// Create an already exists error.
    pub fn already_exists(kind: impl Into<String>, key: ObjectKey) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            key,
        }
    }

    /// Create a conflict error.
    pub fn conflict(
        kind: impl Into<String>,
        key: ObjectKey,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::conflict("Solver", ObjectKey::new("thoth", "numpy"), "3", "4");
        let msg = err.to_string();
        assert!(msg.contains("thoth/numpy"));
        assert!(msg.contains("stale"));
    }

    #[test]
    fn test_predicates_are_distinct() {
        let key = ObjectKey::new("thoth", "numpy");
        let not_found = StoreError::not_found("Solver", key.clone());
        let conflict = StoreError::conflict("Solver", key, "1", "2");

        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert!(!conflict.is_already_exists());
    }
}
