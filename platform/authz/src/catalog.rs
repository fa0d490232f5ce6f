//! Permission catalog.
//!
//! Every grantable capability is a variant of [`Permission`]. The string form is
//! `resource:action`; a string that does not name a variant is not a permission
//! and is never granted.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AuthzError;

/// Set of permissions held by an identity or role.
pub type PermissionSet = BTreeSet<Permission>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Permission {
    ItemsRead,
    ItemsCreate,
    ItemsUpdateOwn,
    ItemsUpdateAny,
    ItemsDeleteOwn,
    ItemsDeleteAny,
    UsersRead,
    UsersInvite,
    UsersUpdate,
    UsersDelete,
    UsersManageRoles,
    UploadsCreate,
    UploadsDeleteOwn,
    UploadsDeleteAny,
    SettingsRead,
    SettingsUpdate,
    BillingRead,
    BillingManage,
    TenantDelete,
}

/// Ownership scope encoded in the action suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Applies only to resources owned by the caller (`_own`).
    Own,
    /// Applies to every resource in the tenant (`_any`).
    Any,
    Unscoped,
}

const ALL: [Permission; 19] = [
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

impl Permission {
    /// The full catalog, in declaration order.
    pub fn all() -> &'static [Permission] {
        &ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ItemsRead => "items:read",
            Permission::ItemsCreate => "items:create",
            Permission::ItemsUpdateOwn => "items:update_own",
            Permission::ItemsUpdateAny => "items:update_any",
            Permission::ItemsDeleteOwn => "items:delete_own",
            Permission::ItemsDeleteAny => "items:delete_any",
            Permission::UsersRead => "users:read",
            Permission::UsersInvite => "users:invite",
            Permission::UsersUpdate => "users:update",
            Permission::UsersDelete => "users:delete",
            Permission::UsersManageRoles => "users:manage_roles",
            Permission::UploadsCreate => "uploads:create",
            Permission::UploadsDeleteOwn => "uploads:delete_own",
            Permission::UploadsDeleteAny => "uploads:delete_any",
            Permission::SettingsRead => "settings:read",
            Permission::SettingsUpdate => "settings:update",
            Permission::BillingRead => "billing:read",
            Permission::BillingManage => "billing:manage",
            Permission::TenantDelete => "tenant:delete",
        }
    }

    /// Exact, case-sensitive lookup. No wildcard or prefix forms exist.
    pub fn parse(value: &str) -> Option<Self> {
        ALL.iter().copied().find(|perm| perm.as_str() == value)
    }

    pub fn resource(self) -> &'static str {
        self.split().0
    }

    pub fn action(self) -> &'static str {
        self.split().1
    }

    pub fn scope(self) -> Scope {
        let action = self.action();
        if action.ends_with("_own") {
            Scope::Own
        } else if action.ends_with("_any") {
            Scope::Any
        } else {
            Scope::Unscoped
        }
    }

    /// The `_any` sibling of an `_own` permission.
    pub fn any_variant(self) -> Option<Self> {
        match self {
            Permission::ItemsUpdateOwn => Some(Permission::ItemsUpdateAny),
            Permission::ItemsDeleteOwn => Some(Permission::ItemsDeleteAny),
            Permission::UploadsDeleteOwn => Some(Permission::UploadsDeleteAny),
            _ => None,
        }
    }

    fn split(self) -> (&'static str, &'static str) {
        // every catalog entry carries exactly one ':'
        self.as_str().split_once(':').unwrap_or((self.as_str(), ""))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s).ok_or_else(|| AuthzError::UnknownPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for &'static str {
    fn from(value: Permission) -> Self {
        value.as_str()
    }
}

/// Anything a decision function can be asked about.
///
/// Raw strings resolve through the catalog; strings outside it yield `None`
/// and are treated as not granted.
pub trait AsPermission {
    fn as_permission(&self) -> Option<Permission>;
}

impl AsPermission for Permission {
    fn as_permission(&self) -> Option<Permission> {
        Some(*self)
    }
}

impl AsPermission for &Permission {
    fn as_permission(&self) -> Option<Permission> {
        Some(**self)
    }
}

impl AsPermission for str {
    fn as_permission(&self) -> Option<Permission> {
        Permission::parse(self)
    }
}

impl AsPermission for &str {
    fn as_permission(&self) -> Option<Permission> {
        Permission::parse(self)
    }
}

impl AsPermission for String {
    fn as_permission(&self) -> Option<Permission> {
        Permission::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_strings_round_trip_through_parse() {
        for perm in Permission::all() {
            assert_eq!(Permission::parse(perm.as_str()), Some(*perm));
        }
    }

    #[test]
    fn catalog_entries_are_unique() {
        let unique: PermissionSet = Permission::all().iter().copied().collect();
        assert_eq!(unique.len(), Permission::all().len());
    }

    #[test]
    fn parse_is_exact_and_case_sensitive() {
        assert_eq!(Permission::parse("Items:Read"), None);
        assert_eq!(Permission::parse("items:*"), None);
        assert_eq!(Permission::parse("items:"), None);
        assert_eq!(Permission::parse(" items:read"), None);
        assert!(matches!(
            "items:archive".parse::<Permission>(),
            Err(AuthzError::UnknownPermission(raw)) if raw == "items:archive"
        ));
    }

    #[test]
    fn scopes_follow_action_suffix() {
        assert_eq!(Permission::ItemsUpdateOwn.scope(), Scope::Own);
        assert_eq!(Permission::ItemsUpdateAny.scope(), Scope::Any);
        assert_eq!(Permission::ItemsRead.scope(), Scope::Unscoped);
        assert_eq!(Permission::UsersManageRoles.resource(), "users");
        assert_eq!(Permission::UsersManageRoles.action(), "manage_roles");
    }

    #[test]
    fn every_own_permission_has_an_any_sibling() {
        for perm in Permission::all() {
            match perm.scope() {
                Scope::Own => {
                    let any = perm.any_variant().expect("own permission without any sibling");
                    assert_eq!(any.scope(), Scope::Any);
                    assert_eq!(any.resource(), perm.resource());
                    assert_eq!(
                        any.action().trim_end_matches("_any"),
                        perm.action().trim_end_matches("_own")
                    );
                }
                _ => assert_eq!(perm.any_variant(), None),
            }
        }
    }

    #[test]
    fn serde_uses_catalog_strings() {
        let json = serde_json::to_string(&Permission::UploadsDeleteAny).unwrap();
        assert_eq!(json, "\"uploads:delete_any\"");
        let parsed: Permission = serde_json::from_str("\"settings:update\"").unwrap();
        assert_eq!(parsed, Permission::SettingsUpdate);
        assert!(serde_json::from_str::<Permission>("\"settings:nuke\"").is_err());
    }
}
