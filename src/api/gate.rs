//! Session gate.
//!
//! Every request is classified by path before it reaches a handler:
//!
//! - **public**: `/api`, `/assets`, and the exact paths `/`, `/health` and
//!   `/favicon.ico`. Passed through without looking at cookies.
//! - **guest-only**: `/login` and `/register`. Visitors with a valid session
//!   are sent to the landing page instead.
//! - **protected**: everything else. Visitors without a valid session are
//!   sent to the login page with `redirect_to` set to where they were going.
//!
//! Lookups run with the mutating cookie context, so a refreshed token pair is
//! written to whatever response comes out, redirect or not.

use super::state::AppState;
use axum::{
    extract::{Request, State},
    http::uri::PathAndQuery,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

const PUBLIC_PREFIXES: [&str; 2] = ["/api", "/assets"];
const PUBLIC_PATHS: [&str; 3] = ["/", "/health", "/favicon.ico"];
const GUEST_PREFIXES: [&str; 2] = ["/login", "/register"];

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// How allow-list prefixes are compared against the request path.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PathMatching {
    /// Plain `starts_with`: `/api` also matches `/apiary`.
    #[default]
    Prefix,
    /// The prefix must end on a segment boundary: `/api` matches `/api` and
    /// `/api/users` but not `/apiary`.
    Segment,
}

impl PathMatching {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prefix" => Some(Self::Prefix),
            "segment" => Some(Self::Segment),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Segment => "segment",
        }
    }

    fn matches(self, path: &str, prefix: &str) -> bool {
        match self {
            Self::Prefix => path.starts_with(prefix),
            Self::Segment => path.strip_prefix(prefix).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/')
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathAccess {
    Public,
    GuestOnly,
    Protected,
}

#[derive(Clone, Debug)]
pub struct GatePolicy {
    matching: PathMatching,
    public_prefixes: Vec<String>,
    public_paths: Vec<String>,
    guest_prefixes: Vec<String>,
    login_path: String,
    landing_path: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_LOGIN_PATH.to_string(),
            DEFAULT_LANDING_PATH.to_string(),
        )
    }
}

impl GatePolicy {
    /// A custom login path is treated as guest-only, like `/login`.
    #[must_use]
    pub fn new(login_path: String, landing_path: String) -> Self {
        let mut guest_prefixes: Vec<String> = GUEST_PREFIXES.iter().map(ToString::to_string).collect();
        if !guest_prefixes.contains(&login_path) {
            guest_prefixes.push(login_path.clone());
        }

        Self {
            matching: PathMatching::default(),
            public_prefixes: PUBLIC_PREFIXES.iter().map(ToString::to_string).collect(),
            public_paths: PUBLIC_PATHS.iter().map(ToString::to_string).collect(),
            guest_prefixes,
            login_path,
            landing_path,
        }
    }

    #[must_use]
    pub fn with_matching(mut self, matching: PathMatching) -> Self {
        self.matching = matching;
        self
    }

    #[must_use]
    pub fn matching(&self) -> PathMatching {
        self.matching
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> PathAccess {
        let matches = |prefix: &String| self.matching.matches(path, prefix);

        if self.guest_prefixes.iter().any(matches) {
            PathAccess::GuestOnly
        } else if self.public_paths.iter().any(|exact| exact == path)
            || self.public_prefixes.iter().any(matches)
        {
            PathAccess::Public
        } else {
            PathAccess::Protected
        }
    }

    /// Login URL carrying the original path and query as `redirect_to`.
    #[must_use]
    pub fn login_redirect(&self, path_and_query: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect_to", path_and_query)
            .finish();
        format!("{}?{query}", self.login_path)
    }
}

/// Middleware applying the [`GatePolicy`] of the application state.
pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = state.gate().classify(request.uri().path());
    if access == PathAccess::Public {
        return next.run(request).await;
    }

    let mut client = state.action_client(request.headers());
    let identity = if client.session().is_some() {
        match client.identity().await {
            Ok(identity) => Some(identity),
            Err(err) => {
                debug!("session lookup failed, treating as anonymous: {err}");
                None
            }
        }
    } else {
        None
    };
    let cookies = client.into_store();

    let mut response = match (access, identity) {
        (PathAccess::Protected, None) => {
            let target = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path(), PathAndQuery::as_str);
            debug!(path = target, "no session, redirecting to login");
            Redirect::temporary(&state.gate().login_redirect(target)).into_response()
        }
        (PathAccess::GuestOnly, Some(_)) => {
            Redirect::temporary(state.gate().landing_path()).into_response()
        }
        (_, identity) => {
            cookies.forward(request.headers_mut());
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
    };

    cookies.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_default_policy() {
        let gate = GatePolicy::default();
        assert_eq!(gate.classify("/"), PathAccess::Public);
        assert_eq!(gate.classify("/health"), PathAccess::Public);
        assert_eq!(gate.classify("/favicon.ico"), PathAccess::Public);
        assert_eq!(gate.classify("/api/auth/session"), PathAccess::Public);
        assert_eq!(gate.classify("/assets/app.css"), PathAccess::Public);
        assert_eq!(gate.classify("/login"), PathAccess::GuestOnly);
        assert_eq!(gate.classify("/register/confirm"), PathAccess::GuestOnly);
        assert_eq!(gate.classify("/dashboard"), PathAccess::Protected);
        assert_eq!(gate.classify("/clientes/42"), PathAccess::Protected);
        assert_eq!(gate.classify("/healthz"), PathAccess::Protected);
    }

    #[test]
    fn prefix_matching_is_literal() {
        let gate = GatePolicy::default();
        assert_eq!(gate.matching(), PathMatching::Prefix);
        assert_eq!(gate.classify("/apiary"), PathAccess::Public);
        assert_eq!(gate.classify("/loginhelp"), PathAccess::GuestOnly);
    }

    #[test]
    fn segment_matching_respects_boundaries() {
        let gate = GatePolicy::default().with_matching(PathMatching::Segment);
        assert_eq!(gate.classify("/api"), PathAccess::Public);
        assert_eq!(gate.classify("/api/admin/users/1"), PathAccess::Public);
        assert_eq!(gate.classify("/apiary"), PathAccess::Protected);
        assert_eq!(gate.classify("/login"), PathAccess::GuestOnly);
        assert_eq!(gate.classify("/loginhelp"), PathAccess::Protected);
    }

    #[test]
    fn custom_login_path_is_guest_only() {
        let gate = GatePolicy::new("/entrar".to_string(), "/inicio".to_string());
        assert_eq!(gate.classify("/entrar"), PathAccess::GuestOnly);
        assert_eq!(gate.classify("/login"), PathAccess::GuestOnly);
        assert_eq!(gate.landing_path(), "/inicio");
    }

    #[test]
    fn login_redirect_encodes_path_and_query() {
        let gate = GatePolicy::default();
        assert_eq!(
            gate.login_redirect("/facturas?page=2&q=a b"),
            "/login?redirect_to=%2Ffacturas%3Fpage%3D2%26q%3Da+b"
        );
    }

    #[test]
    fn path_matching_parse() {
        assert_eq!(PathMatching::parse("Segment"), Some(PathMatching::Segment));
        assert_eq!(PathMatching::parse("prefix"), Some(PathMatching::Prefix));
        assert_eq!(PathMatching::parse("glob"), None);
        assert_eq!(PathMatching::Segment.as_str(), "segment");
    }
}
