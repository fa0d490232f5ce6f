use std::sync::Arc;

use platform_authz::Identity;

use crate::{claims::SessionIssuer, error::AuthnError, verifier::SessionVerifier};

/// What to do with the session cookie after a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    /// No cookie was presented; leave the jar alone.
    Unchanged,
    /// Replace the cookie with a freshly signed token.
    Rotate(String),
    /// The presented session is unusable; remove it.
    Clear,
}

#[derive(Clone, Debug)]
pub struct Refresh {
    pub identity: Option<Identity>,
    pub update: SessionUpdate,
}

impl Refresh {
    fn anonymous(update: SessionUpdate) -> Self {
        Self {
            identity: None,
            update,
        }
    }
}

/// Verifies the presented session once and rotates it.
#[derive(Clone)]
pub struct SessionManager {
    verifier: Arc<dyn SessionVerifier>,
    issuer: SessionIssuer,
}

impl SessionManager {
    pub fn new(verifier: Arc<dyn SessionVerifier>, issuer: SessionIssuer) -> Self {
        Self { verifier, issuer }
    }

    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Resolve the caller for one request.
    ///
    /// Verification failures yield an anonymous result with the cookie
    /// cleared. Only configuration faults are returned as errors.
    pub async fn refresh(&self, token: Option<&str>) -> Result<Refresh, AuthnError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Refresh::anonymous(SessionUpdate::Unchanged));
        };
        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "session verification failed");
                return Ok(Refresh::anonymous(SessionUpdate::Clear));
            }
        };
        // upstream tokens only get a fresh cookie lifetime
        let rotated = if self.verifier.reissues_locally() {
            self.issuer.reissue(&claims)?
        } else {
            token.to_owned()
        };
        Ok(Refresh {
            identity: Some(claims.identity()),
            update: SessionUpdate::Rotate(rotated),
        })
    }
}
