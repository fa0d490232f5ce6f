use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("session token missing")]
    MissingToken,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
    #[error("session expired")]
    Expired,
    #[error("identity service unavailable: {0}")]
    Upstream(String),
    #[error("authentication misconfigured: {0}")]
    Config(String),
}

impl AuthnError {
    /// Only configuration faults escape to the caller; everything else means
    /// "no identity".
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthnError::Config(_))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthnError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthnError::Expired,
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
                AuthnError::Config(err.to_string())
            }
            _ => AuthnError::InvalidToken(err.to_string()),
        }
    }
}
