use super::gate::GatePolicy;
use crate::identity::{IdentityClient, ReadOnlyCookies, ResponseCookies, SessionClient};
use crate::session::CookieConfig;
use axum::http::HeaderMap;

/// Shared, read-only state handed to every request.
#[derive(Debug)]
pub struct AppState {
    identity: IdentityClient,
    cookies: CookieConfig,
    gate: GatePolicy,
    reset_redirect_url: String,
}

impl AppState {
    #[must_use]
    pub fn new(
        identity: IdentityClient,
        cookies: CookieConfig,
        gate: GatePolicy,
        reset_redirect_url: String,
    ) -> Self {
        Self {
            identity,
            cookies,
            gate,
            reset_redirect_url,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    #[must_use]
    pub fn gate(&self) -> &GatePolicy {
        &self.gate
    }

    /// Where email links land after a successful exchange when no `next` was given.
    #[must_use]
    pub fn reset_redirect_url(&self) -> &str {
        &self.reset_redirect_url
    }

    /// Client for render paths: reads the request cookies, never writes.
    #[must_use]
    pub fn render_client(&self, headers: &HeaderMap) -> SessionClient<'_, ReadOnlyCookies> {
        SessionClient::new(
            &self.identity,
            &self.cookies,
            ReadOnlyCookies::from_headers(headers),
        )
    }

    /// Client for mutating paths: writes become `Set-Cookie` headers once the
    /// store is attached to the response.
    #[must_use]
    pub fn action_client(&self, headers: &HeaderMap) -> SessionClient<'_, ResponseCookies> {
        SessionClient::new(
            &self.identity,
            &self.cookies,
            ResponseCookies::from_headers(headers),
        )
    }
}
