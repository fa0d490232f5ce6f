//! Platform authentication helpers.
//!
//! Sessions are signed claim bundles. A [`SessionVerifier`] turns the cookie
//! value into [`SessionClaims`], and [`SessionManager`] wraps verification with
//! per-request rotation so the cookie's expiry slides forward.

mod claims;
mod error;
mod session;
mod verifier;

pub use claims::{SessionClaims, SessionIssuer};
pub use error::AuthnError;
pub use session::{Refresh, SessionManager, SessionUpdate};
pub use verifier::{LocalVerifier, RemoteVerifier, SessionVerifier};
