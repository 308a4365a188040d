//! Ownership links between objects.

use solver_api::{OwnerReference, Resource, Scheme, SchemeError};

/// Mark `owner` as the controlling owner of `object`.
///
/// Idempotent: binding the same owner twice leaves a single reference.
/// Other non-controller references on `object` are kept.
///
/// # Errors
///
/// - [`SchemeError::NotRegistered`] if the owner's kind is unknown to `scheme`
/// - [`SchemeError::MissingUid`] if the owner has not been persisted
/// - [`SchemeError::CrossNamespace`] if the two objects live in different namespaces
/// - [`SchemeError::AlreadyOwned`] if another owner already controls `object`
pub fn set_controller_reference<O: Resource, D: Resource>(
    owner: &O,
    object: &mut D,
    scheme: &Scheme,
) -> Result<(), SchemeError> {
    let gvk = scheme.gvk_for::<O>()?;
    let owner_meta = owner.metadata();
    let uid = owner_meta
        .uid
        .clone()
        .ok_or_else(|| SchemeError::missing_uid(O::KIND, &owner_meta.name))?;

    let meta = object.metadata_mut();
    if meta.namespace != owner_meta.namespace {
        return Err(SchemeError::CrossNamespace {
            owner_namespace: owner_meta.namespace.clone(),
            object_namespace: meta.namespace.clone(),
        });
    }

    if let Some(existing) = meta.controller_ref().filter(|r| r.uid != uid) {
        return Err(SchemeError::AlreadyOwned {
            object: meta.name.clone(),
            kind: existing.kind.clone(),
            owner: existing.name.clone(),
        });
    }

    let reference = OwnerReference {
        api_version: gvk.api_version,
        kind: gvk.kind,
        name: owner_meta.name.clone(),
        uid,
        controller: true,
        block_owner_deletion: true,
    };

    match meta
        .owner_references
        .iter_mut()
        .find(|r| r.uid == reference.uid)
    {
        Some(slot) => *slot = reference,
        None => meta.owner_references.push(reference),
    }
    Ok(())
}
