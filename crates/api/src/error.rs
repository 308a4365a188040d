//! Error types for the object model.

use thiserror::Error;

/// Errors raised while expressing ownership between objects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemeError {
    /// The kind was never registered with the [`Scheme`](crate::Scheme).
    #[error("kind '{kind}' ({api_version}) is not registered with the scheme")]
    NotRegistered { api_version: String, kind: String },

    /// The owner has not been persisted yet, so it has no uid to point at.
    #[error("{kind} '{name}' has no uid; it must be persisted before it can own objects")]
    MissingUid { kind: String, name: String },

    /// The object is already controlled by a different owner.
    #[error("object '{object}' is already controlled by {kind} '{owner}'")]
    AlreadyOwned {
        object: String,
        kind: String,
        owner: String,
    },

    /// Owner and owned object live in different namespaces.
    #[error("cross-namespace owner references are not allowed: owner in '{owner_namespace}', object in '{object_namespace}'")]
    CrossNamespace {
        owner_namespace: String,
        object_namespace: String,
    },
}

impl SchemeError {
    /// Create a not registered error.
    pub fn not_registered(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::NotRegistered {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// Create a missing uid error.
    pub fn missing_uid(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingUid {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
