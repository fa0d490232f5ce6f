//! Dashboard route declarations and sidebar navigation.

use platform_authz::{
    Identity, Permission, PipelineConfig, RequestPipeline, RouteTable, has_any_permission,
    render_if,
};
use serde::Serialize;

pub fn dashboard_routes() -> RouteTable {
    RouteTable::new()
        .route("/dashboard/items", [Permission::ItemsRead])
        .route("/dashboard/items/new", [Permission::ItemsCreate])
        .route("/dashboard/users", [Permission::UsersRead])
        .route("/dashboard/users/roles", [Permission::UsersManageRoles])
        .route("/dashboard/settings", [Permission::SettingsRead])
        .route("/dashboard/billing", [Permission::BillingRead])
}

pub fn dashboard_pipeline() -> RequestPipeline {
    RequestPipeline::new(PipelineConfig::default(), dashboard_routes())
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct NavItem {
    pub title: &'static str,
    pub href: &'static str,
    #[serde(skip)]
    required: &'static [Permission],
}

const NAV: &[NavItem] = &[
    NavItem {
        title: "Overview",
        href: "/dashboard",
        required: &[],
    },
    NavItem {
        title: "Items",
        href: "/dashboard/items",
        required: &[Permission::ItemsRead],
    },
    NavItem {
        title: "Users",
        href: "/dashboard/users",
        required: &[Permission::UsersRead],
    },
    NavItem {
        title: "Roles",
        href: "/dashboard/users/roles",
        required: &[Permission::UsersManageRoles],
    },
    NavItem {
        title: "Settings",
        href: "/dashboard/settings",
        required: &[Permission::SettingsRead],
    },
    NavItem {
        title: "Billing",
        href: "/dashboard/billing",
        required: &[Permission::BillingRead],
    },
];

/// Sidebar entries the caller may open.
pub fn navigation(identity: Option<&Identity>) -> Vec<NavItem> {
    NAV.iter()
        .filter_map(|item| {
            render_if(
                identity,
                |id| item.required.is_empty() || has_any_permission(Some(id), item.required),
                || *item,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use platform_authz::{Role, Verdict};
    use uuid::Uuid;

    use super::*;

    fn titles(identity: Option<&Identity>) -> Vec<&'static str> {
        navigation(identity).iter().map(|item| item.title).collect()
    }

    #[test]
    fn navigation_follows_permissions() {
        let viewer = Identity::new(Uuid::new_v4(), Role::Viewer, Uuid::new_v4());
        assert_eq!(titles(Some(&viewer)), vec!["Overview", "Items", "Settings"]);
        let owner = Identity::new(Uuid::new_v4(), Role::Owner, Uuid::new_v4());
        assert_eq!(titles(Some(&owner)).len(), NAV.len());
        assert!(titles(None).is_empty());
    }

    #[test]
    fn every_nav_entry_is_reachable_for_its_audience() {
        let pipeline = dashboard_pipeline();
        for role in Role::all() {
            let identity = Identity::new(Uuid::new_v4(), *role, Uuid::new_v4());
            for item in navigation(Some(&identity)) {
                assert_eq!(
                    pipeline.evaluate(item.href, Some(&identity)),
                    Verdict::Allow,
                    "{role} sees {} but cannot open it",
                    item.href
                );
            }
        }
    }
}
