use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use platform_authz::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthnError;

/// Signed claims carried by the session cookie.
///
/// Permission overrides ride along in the token so authorization never needs a
/// database lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: String,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(sub: Uuid, role: impl Into<String>, tenant_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            role: role.into(),
            tenant_id,
            permissions: Vec::new(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// The per-request identity these claims describe.
    pub fn identity(&self) -> Identity {
        Identity::from_claims(self.sub, &self.role, self.tenant_id, &self.permissions)
    }
}

/// Mints HS256 session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthnError> {
        if secret.trim().is_empty() {
            return Err(AuthnError::Config("session secret is empty".into()));
        }
        if ttl <= Duration::zero() {
            return Err(AuthnError::Config("session ttl must be positive".into()));
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthnError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|err| AuthnError::Config(err.to_string()))
    }

    pub fn issue(
        &self,
        sub: Uuid,
        role: &str,
        tenant_id: Uuid,
        permissions: &[String],
    ) -> Result<String, AuthnError> {
        let claims =
            SessionClaims::new(sub, role, tenant_id, self.ttl).with_permissions(permissions.iter().cloned());
        self.sign(&claims)
    }

    /// Same subject and grants with a fresh sliding expiry.
    pub fn reissue(&self, claims: &SessionClaims) -> Result<String, AuthnError> {
        let now = Utc::now();
        let rotated = SessionClaims {
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            ..claims.clone()
        };
        self.sign(&rotated)
    }
}

pub(crate) fn decode(token: &str, key: &DecodingKey) -> Result<SessionClaims, AuthnError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    let data = jsonwebtoken::decode::<SessionClaims>(token, key, &validation)?;
    Ok(data.claims)
}
