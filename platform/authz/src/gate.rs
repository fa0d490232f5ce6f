//! Capability gate for conditional rendering.

use crate::identity::Identity;

/// Evaluate `predicate` for a present identity; absent identities never pass.
pub fn gate<F>(identity: Option<&Identity>, predicate: F) -> bool
where
    F: FnOnce(&Identity) -> bool,
{
    identity.is_some_and(predicate)
}

/// Produce `render()` only when the gate passes.
pub fn render_if<F, R, T>(identity: Option<&Identity>, predicate: F, render: R) -> Option<T>
where
    F: FnOnce(&Identity) -> bool,
    R: FnOnce() -> T,
{
    gate(identity, predicate).then(render)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        catalog::Permission,
        decision::{can_perform_action, has_permission},
        roles::Role,
    };

    #[test]
    fn gate_wraps_arbitrary_predicates() {
        let editor = Identity::new(Uuid::new_v4(), Role::Editor, Uuid::new_v4());
        let own_item = editor.subject_id();
        assert!(gate(Some(&editor), |id| has_permission(
            Some(id),
            Permission::ItemsCreate
        )));
        assert!(gate(Some(&editor), |id| can_perform_action(
            Some(id),
            Permission::ItemsDeleteOwn,
            own_item
        )));
        assert!(!gate(Some(&editor), |id| id.role() == Some(Role::Owner)));
    }

    #[test]
    fn absent_identity_never_runs_predicate() {
        let mut called = false;
        assert!(!gate(None, |_| {
            called = true;
            true
        }));
        assert!(!called);
    }

    #[test]
    fn render_if_yields_content_only_when_allowed() {
        let viewer = Identity::new(Uuid::new_v4(), Role::Viewer, Uuid::new_v4());
        let shown = render_if(
            Some(&viewer),
            |id| has_permission(Some(id), Permission::ItemsRead),
            || "items table",
        );
        assert_eq!(shown, Some("items table"));
        let hidden = render_if(
            Some(&viewer),
            |id| has_permission(Some(id), Permission::UsersManageRoles),
            || "role editor",
        );
        assert_eq!(hidden, None);
    }
}
