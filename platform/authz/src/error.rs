use thiserror::Error;

use crate::catalog::Permission;

/// Reasons an authorization check did not pass.
///
/// Decision functions answer with `bool`; this type is only produced by the
/// guard helpers that callers turn into HTTP responses or log lines.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing permission {permission}")]
    Forbidden { permission: Permission },
    #[error("unknown role {0}")]
    UnknownRole(String),
    #[error("unknown permission {0}")]
    UnknownPermission(String),
}

impl AuthzError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated => "UNAUTHENTICATED",
            AuthzError::Forbidden { .. } => "FORBIDDEN",
            AuthzError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthzError::UnknownPermission(_) => "UNKNOWN_PERMISSION",
        }
    }

    /// Unknown catalog lookups resolve to a denial, never to a server fault.
    pub fn is_denial(&self) -> bool {
        !matches!(self, AuthzError::Unauthenticated)
    }
}
