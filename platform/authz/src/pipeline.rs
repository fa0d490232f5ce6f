//! Route-level enforcement.
//!
//! [`RequestPipeline`] sorts a request path into one of three classes and
//! answers with a [`Verdict`]. It never looks at cookies or tokens; the caller
//! verifies the session first and hands in the resulting identity.

use serde::Serialize;

use crate::{catalog::Permission, decision::has_any_permission, identity::Identity};

/// Path matcher used by the public allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathRule {
    Exact(String),
    /// Matches the prefix itself and anything below it on a `/` boundary.
    Prefix(String),
}

impl PathRule {
    pub fn exact(path: impl Into<String>) -> Self {
        PathRule::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        PathRule::Prefix(path.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Exact(exact) => path == exact,
            PathRule::Prefix(prefix) => under_prefix(path, prefix),
        }
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub sign_in_path: String,
    pub sign_up_path: String,
    pub landing_path: String,
    pub forbidden_path: String,
    pub public: Vec<PathRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/sign-in".into(),
            sign_up_path: "/sign-up".into(),
            landing_path: "/dashboard".into(),
            forbidden_path: "/403".into(),
            public: vec![
                PathRule::exact("/"),
                PathRule::exact("/403"),
                PathRule::exact("/health"),
                PathRule::prefix("/auth/callback"),
                PathRule::prefix("/assets"),
                PathRule::prefix("/favicon.ico"),
                // API handlers answer 401/403 through the decision functions
                PathRule::prefix("/api"),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct RouteDeclaration {
    prefix: String,
    required: Vec<Permission>,
}

/// Application-declared permission requirements, keyed by path prefix.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDeclaration>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that paths under `prefix` need at least one of `required`.
    #[must_use]
    pub fn route(mut self, prefix: &str, required: impl IntoIterator<Item = Permission>) -> Self {
        self.routes.push(RouteDeclaration {
            prefix: normalize(prefix).to_string(),
            required: required.into_iter().collect(),
        });
        self
    }

    /// Longest declared prefix covering `path`.
    pub fn required_for(&self, path: &str) -> Option<&[Permission]> {
        let path = normalize(path);
        self.routes
            .iter()
            .filter(|decl| under_prefix(path, &decl.prefix))
            .max_by_key(|decl| decl.prefix.len())
            .map(|decl| decl.required.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Permission])> {
        self.routes
            .iter()
            .map(|decl| (decl.prefix.as_str(), decl.required.as_slice()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Public,
    AuthGate,
    Protected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Redirect(String),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Verdict::Allow => None,
            Verdict::Redirect(target) => Some(target.as_str()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RequestPipeline {
    config: PipelineConfig,
    routes: RouteTable,
}

impl RequestPipeline {
    pub fn new(config: PipelineConfig, routes: RouteTable) -> Self {
        Self { config, routes }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let path = normalize(path);
        // the forbidden page is always reachable, whatever the allow-list says
        if path == normalize(&self.config.forbidden_path)
            || self.config.public.iter().any(|rule| rule.matches(path))
        {
            RouteClass::Public
        } else if under_prefix(path, &self.config.sign_in_path)
            || under_prefix(path, &self.config.sign_up_path)
        {
            RouteClass::AuthGate
        } else {
            RouteClass::Protected
        }
    }

    /// Decide what happens to a request for `target`, a path with an optional
    /// query string. Only the path is classified; the sign-in redirect carries
    /// the whole target.
    ///
    /// `identity` must come from a completed verification; an unverifiable
    /// session is passed as `None`.
    pub fn evaluate(&self, target: &str, identity: Option<&Identity>) -> Verdict {
        let path = target.split_once('?').map_or(target, |(path, _)| path);
        match self.classify(path) {
            RouteClass::Public => Verdict::Allow,
            RouteClass::AuthGate => match identity {
                Some(_) => Verdict::Redirect(self.config.landing_path.clone()),
                None => Verdict::Allow,
            },
            RouteClass::Protected => self.evaluate_protected(path, target, identity),
        }
    }

    fn evaluate_protected(&self, path: &str, target: &str, identity: Option<&Identity>) -> Verdict {
        let Some(identity) = identity else {
            tracing::debug!(path, "unauthenticated request to protected route");
            return Verdict::Redirect(self.sign_in_redirect(target));
        };
        let required = self.routes.required_for(path).unwrap_or(&[]);
        if required.is_empty() || has_any_permission(Some(identity), required) {
            return Verdict::Allow;
        }
        tracing::info!(
            subject_id = %identity.subject_id(),
            tenant_id = %identity.tenant_id(),
            path,
            required = ?required,
            "route access denied"
        );
        Verdict::Redirect(self.config.forbidden_path.clone())
    }

    fn sign_in_redirect(&self, requested: &str) -> String {
        let next: String = url::form_urlencoded::byte_serialize(requested.as_bytes()).collect();
        format!("{}?next={}", self.config.sign_in_path, next)
    }
}
