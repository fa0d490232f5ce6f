//! Role-based authorization for the dashboard.
//!
//! The engine is table driven: a closed [`Permission`] catalog, a static
//! role-to-permission map and a handful of pure decision functions. The
//! [`RequestPipeline`] turns those decisions into allow/redirect verdicts for
//! page routes. Nothing here performs I/O or keeps state between calls.

pub mod catalog;
pub mod decision;
pub mod error;
pub mod gate;
pub mod identity;
pub mod pipeline;
pub mod roles;

pub use catalog::{AsPermission, Permission, PermissionSet, Scope};
pub use decision::{
    can_perform_action, has_all_permissions, has_any_permission, has_permission, require_action,
    require_permission,
};
pub use error::AuthzError;
pub use gate::{gate, render_if};
pub use identity::Identity;
pub use pipeline::{PathRule, PipelineConfig, RequestPipeline, RouteClass, RouteTable, Verdict};
pub use roles::{Role, base_permissions, role_permissions};
