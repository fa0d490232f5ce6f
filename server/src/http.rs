use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, Query, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode, Uri, request::Parts},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use platform_authn::{
    LocalVerifier, RemoteVerifier, SessionIssuer, SessionManager, SessionVerifier,
};
use platform_authz::{
    AuthzError, Identity, Permission, PermissionSet, RequestPipeline, Role, can_perform_action,
    require_permission, role_permissions,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    middleware::{removal_cookie, session_cookie, session_guard},
    routes::{NavItem, dashboard_pipeline, navigation},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionManager,
    pub pipeline: Arc<RequestPipeline>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let verifier: Arc<dyn SessionVerifier> = match config.verify_url.as_deref() {
            Some(url) => {
                info!(%url, "verifying sessions against identity service");
                Arc::new(RemoteVerifier::new(url)?)
            }
            None => Arc::new(LocalVerifier::new(&config.session_secret)?),
        };
        Self::with_verifier(config, verifier)
    }

    pub fn with_verifier(
        config: Arc<AppConfig>,
        verifier: Arc<dyn SessionVerifier>,
    ) -> anyhow::Result<Self> {
        let issuer = SessionIssuer::new(&config.session_secret, config.session_ttl)?;
        Ok(Self {
            sessions: SessionManager::new(verifier, issuer),
            pipeline: Arc::new(dashboard_pipeline()),
            cookie_key: config.cookie_key.clone(),
            config,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "dashboard server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");

    let guarded = Router::new()
        .route("/", get(home_page))
        .route("/health", get(health_handler))
        .route("/403", get(forbidden_page))
        .route("/sign-in", get(sign_in_page))
        .route("/sign-up", get(sign_up_page))
        .route("/dashboard", get(dashboard_page))
        .route("/dashboard/{*section}", get(dashboard_page))
        .route("/api/me", get(me_handler))
        .route("/api/roles", get(roles_handler))
        .route("/api/permissions/check", post(check_handler))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_guard));

    // these manage the session cookie themselves
    let session = Router::new()
        .route("/auth/session", post(dev_session_handler))
        .route("/auth/sign-out", post(sign_out_handler));

    guarded
        .merge(session)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Identity placed in request extensions by the session guard.
#[derive(Clone, Debug)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| AuthzError::Unauthenticated.into())
    }
}

/// Like [`CurrentIdentity`] but tolerates anonymous callers.
#[derive(Clone, Debug)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}

#[derive(Serialize)]
struct PageView {
    page: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    navigation: Vec<NavItem>,
}

impl PageView {
    fn new(page: &'static str, identity: Option<&Identity>) -> Self {
        Self {
            page,
            path: None,
            subject_id: identity.map(Identity::subject_id),
            navigation: navigation(identity),
        }
    }
}

async fn home_page(MaybeIdentity(identity): MaybeIdentity) -> Json<PageView> {
    Json(PageView::new("home", identity.as_ref()))
}

async fn forbidden_page(MaybeIdentity(identity): MaybeIdentity) -> (StatusCode, Json<PageView>) {
    (
        StatusCode::FORBIDDEN,
        Json(PageView::new("forbidden", identity.as_ref())),
    )
}

#[derive(Deserialize)]
struct SignInQuery {
    next: Option<String>,
}

#[derive(Serialize)]
struct SignInView {
    page: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<String>,
}

// `next` is echoed for display only; after sign-in the pipeline always lands on
// the default route
async fn sign_in_page(Query(query): Query<SignInQuery>) -> Json<SignInView> {
    Json(SignInView {
        page: "sign-in",
        requested: query.next,
    })
}

async fn sign_up_page() -> Json<SignInView> {
    Json(SignInView {
        page: "sign-up",
        requested: None,
    })
}

async fn dashboard_page(uri: Uri, CurrentIdentity(identity): CurrentIdentity) -> Json<PageView> {
    Json(PageView {
        path: Some(uri.path().to_owned()),
        ..PageView::new("dashboard", Some(&identity))
    })
}

async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "not found")
}

#[derive(Serialize)]
struct MePayload {
    subject_id: Uuid,
    tenant_id: Uuid,
    role: Option<Role>,
    role_label: Option<&'static str>,
    permissions: PermissionSet,
    overrides: PermissionSet,
    navigation: Vec<NavItem>,
}

async fn me_handler(CurrentIdentity(identity): CurrentIdentity) -> Json<MePayload> {
    Json(MePayload {
        subject_id: identity.subject_id(),
        tenant_id: identity.tenant_id(),
        role: identity.role(),
        role_label: identity.role().map(Role::label),
        permissions: identity.effective_permissions(),
        overrides: identity.overrides().clone(),
        navigation: navigation(Some(&identity)),
    })
}

#[derive(Serialize)]
struct RoleEntry {
    role: Role,
    label: &'static str,
    permissions: &'static [Permission],
}

async fn roles_handler(CurrentIdentity(identity): CurrentIdentity) -> HttpResult<Json<Vec<RoleEntry>>> {
    require_permission(Some(&identity), Permission::UsersRead)?;
    let roles = Role::all()
        .iter()
        .map(|role| RoleEntry {
            role: *role,
            label: role.label(),
            permissions: role_permissions(*role),
        })
        .collect();
    Ok(Json(roles))
}

#[derive(Deserialize)]
struct CheckRequest {
    permission: String,
    resource_owner_id: Option<Uuid>,
}

#[derive(Serialize)]
struct CheckResponse {
    permission: String,
    allowed: bool,
}

/// Decision endpoint for clients that gate their own UI. Denial is a normal
/// `allowed: false` answer, not an error.
async fn check_handler(
    CurrentIdentity(identity): CurrentIdentity,
    Json(body): Json<CheckRequest>,
) -> Json<CheckResponse> {
    // without an owner, ownership-scoped permissions only pass through their _any sibling
    let owner = body.resource_owner_id.unwrap_or_else(Uuid::nil);
    let allowed = can_perform_action(Some(&identity), body.permission.as_str(), owner);
    Json(CheckResponse {
        permission: body.permission,
        allowed,
    })
}

#[derive(Deserialize)]
struct DevSessionRequest {
    subject_id: Option<Uuid>,
    role: String,
    tenant_id: Option<Uuid>,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Serialize)]
struct DevSessionResponse {
    subject_id: Uuid,
    tenant_id: Uuid,
}

async fn dev_session_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(body): Json<DevSessionRequest>,
) -> HttpResult<(PrivateCookieJar, Json<DevSessionResponse>)> {
    if !state.config.dev_sessions {
        return Err(HttpError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "not found"));
    }
    let subject_id = body.subject_id.unwrap_or_else(Uuid::new_v4);
    let tenant_id = body.tenant_id.unwrap_or_else(Uuid::new_v4);
    let issuer = state.sessions.issuer();
    let token = issuer
        .issue(subject_id, &body.role, tenant_id, &body.permissions)
        .map_err(|err| HttpError::internal(err.into()))?;
    info!(%subject_id, role = %body.role, "issued development session");
    let jar = jar.add(session_cookie(token, issuer.ttl()));
    Ok((
        jar,
        Json(DevSessionResponse {
            subject_id,
            tenant_id,
        }),
    ))
}

async fn sign_out_handler(jar: PrivateCookieJar) -> (PrivateCookieJar, StatusCode) {
    let jar = jar.remove(removal_cookie());
    (jar, StatusCode::NO_CONTENT)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl HttpError {
    pub fn new(status: StatusCode, code: &'static str, msg: &str) -> Self {
        Self {
            status,
            code,
            message: msg.to_string(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "internal server error",
        )
    }
}

impl From<AuthzError> for HttpError {
    fn from(err: AuthzError) -> Self {
        let status = if err.is_denial() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::UNAUTHORIZED
        };
        Self::new(status, err.code(), &err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
