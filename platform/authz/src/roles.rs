//! Role to permission table.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Permission, PermissionSet},
    error::AuthzError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Editor,
    Viewer,
}

const OWNER: &[Permission] = &[
    Permission::ItemsRead,
    Permission::ItemsCreate,
    Permission::ItemsUpdateOwn,
    Permission::ItemsUpdateAny,
    Permission::ItemsDeleteOwn,
    Permission::ItemsDeleteAny,
    Permission::UsersRead,
    Permission::UsersInvite,
    Permission::UsersUpdate,
    Permission::UsersDelete,
    Permission::UsersManageRoles,
    Permission::UploadsCreate,
    Permission::UploadsDeleteOwn,
    Permission::UploadsDeleteAny,
    Permission::SettingsRead,
    Permission::SettingsUpdate,
    Permission::BillingRead,
    Permission::BillingManage,
    Permission::TenantDelete,
];

const ADMIN: &[Permission] = &[
    Permission::ItemsRead,
    Permission::ItemsCreate,
    Permission::ItemsUpdateOwn,
    Permission::ItemsUpdateAny,
    Permission::ItemsDeleteOwn,
    Permission::ItemsDeleteAny,
    Permission::UsersRead,
    Permission::UsersInvite,
    Permission::UsersUpdate,
    Permission::UsersDelete,
    Permission::UsersManageRoles,
    Permission::UploadsCreate,
    Permission::UploadsDeleteOwn,
    Permission::UploadsDeleteAny,
    Permission::SettingsRead,
    Permission::SettingsUpdate,
    Permission::BillingRead,
];

const MANAGER: &[Permission] = &[
    Permission::ItemsRead,
    Permission::ItemsCreate,
    Permission::ItemsUpdateOwn,
    Permission::ItemsUpdateAny,
    Permission::ItemsDeleteOwn,
    Permission::ItemsDeleteAny,
    Permission::UsersRead,
    Permission::UsersInvite,
    Permission::UploadsCreate,
    Permission::UploadsDeleteOwn,
    Permission::UploadsDeleteAny,
    Permission::SettingsRead,
    Permission::BillingRead,
];

const EDITOR: &[Permission] = &[
    Permission::ItemsRead,
    Permission::ItemsCreate,
    Permission::ItemsUpdateOwn,
    Permission::ItemsDeleteOwn,
    Permission::UploadsCreate,
    Permission::UploadsDeleteOwn,
    Permission::SettingsRead,
];

const VIEWER: &[Permission] = &[Permission::ItemsRead, Permission::SettingsRead];

impl Role {
    pub fn all() -> &'static [Role] {
        &[
            Role::Owner,
            Role::Admin,
            Role::Manager,
            Role::Editor,
            Role::Viewer,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Administrator",
            Role::Manager => "Manager",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Role::all().iter().copied().find(|role| role.as_str() == value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}

/// Static grant list for a role.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Owner => OWNER,
        Role::Admin => ADMIN,
        Role::Manager => MANAGER,
        Role::Editor => EDITOR,
        Role::Viewer => VIEWER,
    }
}

/// Base permissions for a role name as it appears in claims.
///
/// Unrecognized names get the empty set.
pub fn base_permissions(role: &str) -> PermissionSet {
    match Role::parse(role) {
        Some(role) => role_permissions(role).iter().copied().collect(),
        None => {
            tracing::debug!(role, "unrecognized role resolves to no permissions");
            PermissionSet::new()
        }
    }
}
