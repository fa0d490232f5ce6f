//! Pure permission checks.
//!
//! Every function takes the caller as `Option<&Identity>`. An absent caller is
//! denied by all of them except [`has_all_permissions`] on an empty list, which
//! is vacuously true.

use uuid::Uuid;

use crate::{
    catalog::{AsPermission, Permission, Scope},
    error::AuthzError,
    identity::Identity,
};

/// `permission` is in the role's base set or the identity's overrides.
pub fn has_permission<P>(identity: Option<&Identity>, permission: P) -> bool
where
    P: AsPermission,
{
    match (identity, permission.as_permission()) {
        (Some(identity), Some(permission)) => identity.holds(permission),
        _ => false,
    }
}

pub fn has_any_permission<P>(identity: Option<&Identity>, permissions: &[P]) -> bool
where
    P: AsPermission,
{
    permissions
        .iter()
        .any(|permission| has_permission(identity, permission.as_permission()))
}

/// True for an empty list regardless of identity.
pub fn has_all_permissions<P>(identity: Option<&Identity>, permissions: &[P]) -> bool
where
    P: AsPermission,
{
    permissions
        .iter()
        .all(|permission| has_permission(identity, permission.as_permission()))
}

/// Ownership-aware check against a specific resource.
///
/// An `_own` permission passes when the identity holds the matching `_any`
/// permission, or holds the `_own` permission and owns the resource. Other
/// permissions ignore the owner entirely.
pub fn can_perform_action<P>(
    identity: Option<&Identity>,
    permission: P,
    resource_owner_id: Uuid,
) -> bool
where
    P: AsPermission,
{
    let (Some(identity), Some(permission)) = (identity, permission.as_permission()) else {
        return false;
    };
    match permission.scope() {
        Scope::Own => {
            let dominated = permission
                .any_variant()
                .is_some_and(|any| identity.holds(any));
            dominated || (identity.holds(permission) && identity.owns(resource_owner_id))
        }
        Scope::Any | Scope::Unscoped => identity.holds(permission),
    }
}

/// Guard form of [`has_permission`] for handlers that answer with an error.
pub fn require_permission<P>(identity: Option<&Identity>, permission: P) -> Result<(), AuthzError>
where
    P: AsPermission + ToString,
{
    let Some(identity) = identity else {
        return Err(AuthzError::Unauthenticated);
    };
    let Some(resolved) = permission.as_permission() else {
        return Err(AuthzError::UnknownPermission(permission.to_string()));
    };
    if identity.holds(resolved) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            permission: resolved,
        })
    }
}

/// Guard form of [`can_perform_action`].
pub fn require_action(
    identity: Option<&Identity>,
    permission: Permission,
    resource_owner_id: Uuid,
) -> Result<(), AuthzError> {
    if identity.is_none() {
        return Err(AuthzError::Unauthenticated);
    }
    if can_perform_action(identity, permission, resource_owner_id) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { permission })
    }
}

impl AsPermission for Option<Permission> {
    fn as_permission(&self) -> Option<Permission> {
        *self
    }
}
