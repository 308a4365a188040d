//! Object metadata shared by every kind.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespaced name identifying an object of a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a new key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Back-reference from an owned object to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// At most one owner reference per object may be the controller.
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// Metadata common to all objects.
///
/// `uid`, `resource_version` and `creation_timestamp` are assigned by the
/// store; anything a client puts there on create is overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Create metadata for a not-yet-persisted object.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// The namespaced key of this object.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// The owner reference flagged as controller, if any.
    #[must_use]
    pub fn controller_ref(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    /// Whether the controller reference points at the given owner uid.
    #[must_use]
    pub fn is_controlled_by(&self, owner_uid: &str) -> bool {
        self.controller_ref().is_some_and(|r| r.uid == owner_uid)
    }

    /// Whether any owner reference points at an owner of `kind` with `uid`.
    #[must_use]
    pub fn has_owner(&self, kind: &str, uid: &str) -> bool {
        self.owner_references
            .iter()
            .any(|r| r.kind == kind && r.uid == uid)
    }
}

/// Everything the store and reconciler need to handle an object kind.
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    /// API group and version, e.g. `batch/v1`.
    const API_VERSION: &'static str;
    /// Kind name, e.g. `Job`.
    const KIND: &'static str;

    /// Observed state, written through the status path only.
    type Status: Clone + Default + PartialEq + fmt::Debug + Send + Sync;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
    fn status(&self) -> &Self::Status;
    fn status_mut(&mut self) -> &mut Self::Status;

    /// The namespaced key of this object.
    fn key(&self) -> ObjectKey {
        self.metadata().key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_ref(uid: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "thoth-station.ninja/v1alpha1".to_string(),
            kind: "Solver".to_string(),
            name: "numpy".to_string(),
            uid: uid.to_string(),
            controller,
            block_owner_deletion: true,
        }
    }

    #[test]
    fn test_key_display() {
        let key = ObjectKey::new("thoth", "numpy");
        assert_eq!(key.to_string(), "thoth/numpy");
    }

    #[test]
    fn test_controller_ref_ignores_non_controller_owners() {
        let mut meta = ObjectMeta::new("thoth", "numpy-job");
        meta.owner_references.push(owner_ref("a", false));
        assert!(meta.controller_ref().is_none());

        meta.owner_references.push(owner_ref("b", true));
        assert_eq!(meta.controller_ref().map(|r| r.uid.as_str()), Some("b"));
        assert!(meta.is_controlled_by("b"));
        assert!(!meta.is_controlled_by("a"));
        assert!(meta.has_owner("Solver", "a"));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let mut meta = ObjectMeta::new("thoth", "numpy-job");
        meta.resource_version = Some("7".to_string());
        meta.owner_references.push(owner_ref("u1", true));

        let json = serde_json::to_value(&meta).unwrap_or_default();
        assert_eq!(json["resourceVersion"], "7");
        assert_eq!(json["ownerReferences"][0]["blockOwnerDeletion"], true);
        assert!(json.get("labels").is_none());
    }
}
