use serde::Serialize;
use uuid::Uuid;

use crate::{
    catalog::{Permission, PermissionSet},
    roles::{Role, role_permissions},
};

/// Authenticated caller, built once per request from verified claims.
///
/// The absent caller is `None` wherever an `Option<&Identity>` is taken; there
/// is no guest identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    subject_id: Uuid,
    role: Option<Role>,
    tenant_id: Uuid,
    overrides: PermissionSet,
}

impl Identity {
    pub fn new(subject_id: Uuid, role: Role, tenant_id: Uuid) -> Self {
        Self {
            subject_id,
            role: Some(role),
            tenant_id,
            overrides: PermissionSet::new(),
        }
    }

    /// Build from raw claim values.
    ///
    /// An unrecognized role leaves the identity with no base permissions and
    /// override strings outside the catalog are dropped.
    pub fn from_claims<I, S>(subject_id: Uuid, role: &str, tenant_id: Uuid, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed_role = Role::parse(role);
        if parsed_role.is_none() {
            tracing::warn!(%subject_id, role, "claims carry an unknown role");
        }
        let overrides = overrides
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                let perm = Permission::parse(raw);
                if perm.is_none() {
                    tracing::warn!(%subject_id, permission = raw, "dropping unknown override");
                }
                perm
            })
            .collect();
        Self {
            subject_id,
            role: parsed_role,
            tenant_id,
            overrides,
        }
    }

    #[must_use]
    pub fn with_override(mut self, permission: Permission) -> Self {
        self.overrides.insert(permission);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.overrides.extend(permissions);
        self
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn overrides(&self) -> &PermissionSet {
        &self.overrides
    }

    pub fn base_permissions(&self) -> &'static [Permission] {
        self.role.map(role_permissions).unwrap_or(&[])
    }

    /// Base grants plus overrides.
    pub fn effective_permissions(&self) -> PermissionSet {
        self.base_permissions()
            .iter()
            .copied()
            .chain(self.overrides.iter().copied())
            .collect()
    }

    pub fn holds(&self, permission: Permission) -> bool {
        self.base_permissions().contains(&permission) || self.overrides.contains(&permission)
    }

    pub fn owns(&self, owner_subject_id: Uuid) -> bool {
        self.subject_id == owner_subject_id
    }
}
