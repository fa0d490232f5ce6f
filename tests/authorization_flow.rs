use anyhow::{Context, Result};
use chrono::Duration;
use platform_authn::{SessionClaims, SessionIssuer, SessionUpdate};
use platform_authz::{
    Identity, Permission, PipelineConfig, RequestPipeline, Role, RouteTable, Verdict,
    can_perform_action, has_all_permissions, has_any_permission, has_permission,
};
use suite_tests::{TEST_SECRET, session_manager, sign_in};
use uuid::Uuid;

fn pipeline() -> RequestPipeline {
    let routes = RouteTable::new()
        .route("/dashboard/items", [Permission::ItemsRead])
        .route("/dashboard/items/new", [Permission::ItemsCreate])
        .route("/dashboard/billing", [Permission::BillingRead, Permission::BillingManage]);
    RequestPipeline::new(PipelineConfig::default(), routes)
}

async fn identity_for(role: &str, overrides: &[&str]) -> Result<(Uuid, Identity)> {
    let manager = session_manager(Duration::minutes(15))?;
    let subject = Uuid::new_v4();
    let token = sign_in(&manager, subject, role, overrides)?;
    let refresh = manager.refresh(Some(&token)).await?;
    assert!(matches!(refresh.update, SessionUpdate::Rotate(_)));
    let identity = refresh.identity.context("session should resolve an identity")?;
    Ok((subject, identity))
}

#[tokio::test]
async fn editor_session_flows_through_pipeline() -> Result<()> {
    let (subject, editor) = identity_for("editor", &[]).await?;
    let pipeline = pipeline();

    assert_eq!(editor.role(), Some(Role::Editor));
    assert_eq!(pipeline.evaluate("/dashboard/items", Some(&editor)), Verdict::Allow);
    assert_eq!(pipeline.evaluate("/dashboard/items/new", Some(&editor)), Verdict::Allow);
    assert_eq!(
        pipeline.evaluate("/dashboard/billing", Some(&editor)),
        Verdict::Redirect("/403".into())
    );
    assert_eq!(
        pipeline.evaluate("/sign-in", Some(&editor)),
        Verdict::Redirect("/dashboard".into())
    );

    assert!(can_perform_action(Some(&editor), "items:update_own", subject));
    assert!(!can_perform_action(Some(&editor), "items:update_own", Uuid::new_v4()));
    Ok(())
}

#[tokio::test]
async fn viewer_with_override_gains_only_the_override() -> Result<()> {
    let (_, viewer) = identity_for("viewer", &["billing:read", "billing:everything"]).await?;
    let pipeline = pipeline();

    assert!(has_permission(Some(&viewer), Permission::BillingRead));
    assert!(!has_permission(Some(&viewer), "billing:everything"));
    assert!(!has_permission(Some(&viewer), Permission::BillingManage));
    assert_eq!(pipeline.evaluate("/dashboard/billing", Some(&viewer)), Verdict::Allow);
    assert_eq!(
        pipeline.evaluate("/dashboard/items/new", Some(&viewer)),
        Verdict::Redirect("/403".into())
    );
    Ok(())
}

#[tokio::test]
async fn admin_lacks_owner_only_grants() -> Result<()> {
    let (_, admin) = identity_for("admin", &[]).await?;
    assert!(has_any_permission(
        Some(&admin),
        &[Permission::BillingManage, Permission::UsersDelete]
    ));
    assert!(!has_all_permissions(
        Some(&admin),
        &[Permission::BillingManage, Permission::UsersDelete]
    ));
    assert!(can_perform_action(Some(&admin), "items:delete_own", Uuid::new_v4()));
    assert!(!has_permission(Some(&admin), Permission::TenantDelete));
    Ok(())
}

#[tokio::test]
async fn unknown_role_is_signed_in_without_grants() -> Result<()> {
    let (_, identity) = identity_for("superuser", &[]).await?;
    let pipeline = pipeline();

    assert_eq!(identity.role(), None);
    assert!(identity.effective_permissions().is_empty());
    assert_eq!(pipeline.evaluate("/dashboard", Some(&identity)), Verdict::Allow);
    assert_eq!(
        pipeline.evaluate("/dashboard/items", Some(&identity)),
        Verdict::Redirect("/403".into())
    );
    Ok(())
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_sign_in() -> Result<()> {
    let manager = session_manager(Duration::minutes(15))?;
    let refresh = manager.refresh(None).await?;
    assert!(refresh.identity.is_none());
    assert_eq!(refresh.update, SessionUpdate::Unchanged);

    let pipeline = pipeline();
    assert_eq!(
        pipeline.evaluate("/dashboard/items", None),
        Verdict::Redirect("/sign-in?next=%2Fdashboard%2Fitems".into())
    );
    assert_eq!(pipeline.evaluate("/403", None), Verdict::Allow);
    assert_eq!(pipeline.evaluate("/sign-in", None), Verdict::Allow);
    assert!(has_all_permissions::<Permission>(None, &[]));
    Ok(())
}

#[tokio::test]
async fn expired_session_is_cleared() -> Result<()> {
    let manager = session_manager(Duration::minutes(15))?;
    let issuer = SessionIssuer::new(TEST_SECRET, Duration::minutes(15))?;
    let mut claims = SessionClaims::new(Uuid::new_v4(), "owner", Uuid::new_v4(), Duration::minutes(15));
    claims.exp = claims.iat - 60;
    let token = issuer.sign(&claims)?;

    let refresh = manager.refresh(Some(&token)).await?;
    assert!(refresh.identity.is_none());
    assert_eq!(refresh.update, SessionUpdate::Clear);
    Ok(())
}

#[tokio::test]
async fn rotated_session_keeps_identity() -> Result<()> {
    let manager = session_manager(Duration::minutes(15))?;
    let subject = Uuid::new_v4();
    let token = sign_in(&manager, subject, "manager", &["users:invite"])?;

    let first = manager.refresh(Some(&token)).await?;
    let SessionUpdate::Rotate(rotated) = first.update else {
        panic!("valid session should rotate");
    };
    let second = manager.refresh(Some(&rotated)).await?;
    let identity = second.identity.context("rotated session should verify")?;
    assert_eq!(identity.subject_id(), subject);
    assert_eq!(identity.role(), Some(Role::Manager));
    assert!(identity.overrides().contains(&Permission::UsersInvite));
    Ok(())
}
