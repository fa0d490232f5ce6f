use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Duration;
use platform_authn::SessionUpdate;
use platform_authz::Verdict;
use time::Duration as TimeDuration;

use crate::http::{AppState, HttpError};

pub const SESSION_COOKIE: &str = "__Host-dash_session";

/// Request-pipeline adapter.
///
/// Verifies the session exactly once, rotates the cookie, then lets the
/// pipeline decide. The cookie update rides on every response, denials
/// included.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());
    let refresh = match state.sessions.refresh(token.as_deref()).await {
        Ok(refresh) => refresh,
        Err(err) => {
            tracing::error!(error = %err, "session verification misconfigured");
            return HttpError::internal(err.into()).into_response();
        }
    };
    let jar = apply_session_update(jar, refresh.update, state.sessions.issuer().ttl());

    let uri = request.uri();
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());
    let response = match state.pipeline.evaluate(&target, refresh.identity.as_ref()) {
        Verdict::Allow => {
            if let Some(identity) = refresh.identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        Verdict::Redirect(location) => Redirect::to(&location).into_response(),
    };
    (jar, response).into_response()
}

pub fn apply_session_update(
    jar: PrivateCookieJar,
    update: SessionUpdate,
    ttl: Duration,
) -> PrivateCookieJar {
    match update {
        SessionUpdate::Unchanged => jar,
        SessionUpdate::Rotate(token) => jar.add(session_cookie(token, ttl)),
        SessionUpdate::Clear => jar.remove(removal_cookie()),
    }
}

/// `__Host-` cookies are only replaced by a Set-Cookie with the same
/// `Secure` and `Path=/` attributes, removals included.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn session_cookie(token: String, ttl: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(ttl.num_seconds()))
        .build()
}
