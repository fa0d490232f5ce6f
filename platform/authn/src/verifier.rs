//! Session verification backends.

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::StatusCode;
use url::Url;

use crate::{
    claims::{SessionClaims, decode},
    error::AuthnError,
};

/// Turns a raw session token into trusted claims.
///
/// Implementations may perform one network round trip; callers wait for the
/// result before making any authorization decision.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthnError>;

    /// Whether a verified session may be re-signed with the local session
    /// secret. Tokens minted elsewhere must be handed back unchanged.
    fn reissues_locally(&self) -> bool {
        true
    }
}

/// Validates tokens signed with the shared session secret.
pub struct LocalVerifier {
    key: DecodingKey,
}

impl LocalVerifier {
    pub fn new(secret: &str) -> Result<Self, AuthnError> {
        if secret.trim().is_empty() {
            return Err(AuthnError::Config("session secret is empty".into()));
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

#[async_trait]
impl SessionVerifier for LocalVerifier {
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthnError> {
        if token.is_empty() {
            return Err(AuthnError::MissingToken);
        }
        decode(token, &self.key)
    }
}

/// Asks the hosted auth service who a token belongs to.
///
/// The service answers `GET <endpoint>` with `Authorization: Bearer <token>`
/// and a JSON claims body.
pub struct RemoteVerifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteVerifier {
    pub fn new(endpoint: &str) -> Result<Self, AuthnError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| AuthnError::Config(format!("invalid verify url {endpoint}: {err}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SessionVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthnError> {
        if token.is_empty() {
            return Err(AuthnError::MissingToken);
        }
        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| AuthnError::Upstream(err.to_string()))?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthnError::InvalidToken("rejected by identity service".into()));
            }
            status => return Err(AuthnError::Upstream(format!("unexpected status {status}"))),
        }
        let claims: SessionClaims = response
            .json()
            .await
            .map_err(|err| AuthnError::Upstream(err.to_string()))?;
        if claims.is_expired() {
            return Err(AuthnError::Expired);
        }
        Ok(claims)
    }

    fn reissues_locally(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{Json, Router, http::HeaderMap, http::StatusCode as AxumStatus, routing::get};
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        claims::SessionIssuer,
        session::{SessionManager, SessionUpdate},
    };

    const SECRET: &str = "unit-test-secret";

    #[tokio::test]
    async fn local_verifier_accepts_issued_tokens() {
        let issuer = SessionIssuer::new(SECRET, Duration::minutes(10)).unwrap();
        let sub = Uuid::new_v4();
        let token = issuer
            .issue(sub, "manager", Uuid::new_v4(), &["billing:manage".to_string()])
            .unwrap();
        let claims = LocalVerifier::new(SECRET).unwrap().verify(&token).await.unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.permissions, vec!["billing:manage".to_string()]);
    }

    #[tokio::test]
    async fn local_verifier_rejects_foreign_signatures() {
        let issuer = SessionIssuer::new("someone-else", Duration::minutes(10)).unwrap();
        let token = issuer.issue(Uuid::new_v4(), "owner", Uuid::new_v4(), &[]).unwrap();
        let err = LocalVerifier::new(SECRET).unwrap().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthnError::InvalidToken(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn local_verifier_reports_expiry() {
        let issuer = SessionIssuer::new(SECRET, Duration::minutes(10)).unwrap();
        let mut claims = SessionClaims::new(Uuid::new_v4(), "viewer", Uuid::new_v4(), Duration::minutes(10));
        claims.exp = claims.iat - 3600;
        let token = issuer.sign(&claims).unwrap();
        let err = LocalVerifier::new(SECRET).unwrap().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthnError::Expired));
    }

    #[tokio::test]
    async fn local_verifier_rejects_garbage() {
        let verifier = LocalVerifier::new(SECRET).unwrap();
        assert!(matches!(
            verifier.verify("").await,
            Err(AuthnError::MissingToken)
        ));
        assert!(matches!(
            verifier.verify("not.a.jwt").await,
            Err(AuthnError::InvalidToken(_))
        ));
    }

    async fn spawn_identity_service(claims: SessionClaims) -> SocketAddr {
        let app = Router::new().route(
            "/auth/v1/user",
            get(move |headers: HeaderMap| {
                let claims = claims.clone();
                async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer good-token");
                    if authorized {
                        Ok(Json(claims))
                    } else {
                        Err(AxumStatus::UNAUTHORIZED)
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn remote_verifier_round_trips_to_identity_service() {
        let claims = SessionClaims::new(Uuid::new_v4(), "admin", Uuid::new_v4(), Duration::minutes(5));
        let addr = spawn_identity_service(claims.clone()).await;
        let verifier = RemoteVerifier::new(&format!("http://{addr}/auth/v1/user")).unwrap();

        let verified = verifier.verify("good-token").await.unwrap();
        assert_eq!(verified, claims);

        let rejected = verifier.verify("bad-token").await.unwrap_err();
        assert!(matches!(rejected, AuthnError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn remote_sessions_survive_consecutive_requests() {
        let claims = SessionClaims::new(Uuid::new_v4(), "editor", Uuid::new_v4(), Duration::minutes(5));
        let addr = spawn_identity_service(claims.clone()).await;
        let verifier = RemoteVerifier::new(&format!("http://{addr}/auth/v1/user")).unwrap();
        let issuer = SessionIssuer::new(SECRET, Duration::minutes(10)).unwrap();
        let manager = SessionManager::new(std::sync::Arc::new(verifier), issuer);

        let first = manager.refresh(Some("good-token")).await.unwrap();
        assert_eq!(first.identity.map(|id| id.subject_id()), Some(claims.sub));
        let SessionUpdate::Rotate(cookie) = first.update else {
            panic!("verified session should be re-set");
        };
        assert_eq!(cookie, "good-token");

        let second = manager.refresh(Some(&cookie)).await.unwrap();
        assert_eq!(second.identity.map(|id| id.subject_id()), Some(claims.sub));
        assert_eq!(second.update, SessionUpdate::Rotate("good-token".into()));
    }

    #[tokio::test]
    async fn remote_verifier_maps_unreachable_service_to_upstream() {
        let verifier = RemoteVerifier::new("http://127.0.0.1:9/auth/v1/user").unwrap();
        let err = verifier.verify("anything").await.unwrap_err();
        assert!(matches!(err, AuthnError::Upstream(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn remote_verifier_requires_valid_url() {
        assert!(matches!(
            RemoteVerifier::new("not a url"),
            Err(AuthnError::Config(_))
        ));
    }
}
