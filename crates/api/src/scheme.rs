//! Explicit registry of kinds known to the operator.
//!
//! An owner reference names its owner by api version and kind, so the
//! owner's kind must be registered before anything can point at it.
//! The scheme is built once at start-up and passed around by reference;
//! there is no global registration.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemeError;
use crate::meta::Resource;

/// Fully-qualified kind identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionKind {
    pub api_version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// The identifier of a [`Resource`] type.
    #[must_use]
    pub fn of<K: Resource>() -> Self {
        Self::new(K::API_VERSION, K::KIND)
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version, self.kind)
    }
}

/// Set of registered kinds.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: BTreeSet<GroupVersionKind>,
}

impl Scheme {
    /// Create an empty scheme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. Registering twice is a no-op.
    pub fn register<K: Resource>(&mut self) -> &mut Self {
        self.kinds.insert(GroupVersionKind::of::<K>());
        self
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with<K: Resource>(mut self) -> Self {
        self.register::<K>();
        self
    }

    /// Check whether a kind is registered.
    #[must_use]
    pub fn is_registered<K: Resource>(&self) -> bool {
        self.kinds.contains(&GroupVersionKind::of::<K>())
    }

    /// Look up the identifier of a registered kind.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError::NotRegistered`] if `K` was never registered.
    pub fn gvk_for<K: Resource>(&self) -> Result<GroupVersionKind, SchemeError> {
        let gvk = GroupVersionKind::of::<K>();
        if self.kinds.contains(&gvk) {
            Ok(gvk)
        } else {
            Err(SchemeError::not_registered(gvk.api_version, gvk.kind))
        }
    }

    /// All registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.kinds.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Job, Solver};

    #[test]
    fn test_unregistered_kind_is_rejected() {
        let scheme = Scheme::new().with::<Job>();
        assert!(!scheme.is_registered::<Solver>());
        assert_eq!(
            scheme.gvk_for::<Solver>(),
            Err(SchemeError::not_registered(
                "thoth-station.ninja/v1alpha1",
                "Solver"
            ))
        );
    }

    #[test]
    fn test_registered_kind_resolves() {
        let mut scheme = Scheme::new();
        scheme.register::<Solver>().register::<Solver>();

        let gvk = scheme.gvk_for::<Solver>();
        assert_eq!(
            gvk.map(|g| g.kind),
            Ok("Solver".to_string())
        );
        assert_eq!(scheme.kinds().count(), 1);
    }

    #[test]
    fn test_gvk_display() {
        assert_eq!(
            GroupVersionKind::of::<Job>().to_string(),
            "batch/v1, Kind=Job"
        );
    }
}
