//! Session cookie names, lifetimes and attributes.

use crate::session::model::TokenPair;
use cookie::{Cookie, SameSite};
use secrecy::ExposeSecret;
use time::{Duration, OffsetDateTime};
use tracing::warn;

pub const ACCESS_COOKIE_NAME: &str = "sb-access-token";
pub const REFRESH_COOKIE_NAME: &str = "sb-refresh-token";
/// PKCE verifier left by the client-side library that started a code flow.
pub const CODE_VERIFIER_COOKIE_NAME: &str = "sb-code-verifier";

/// Access cookie lifetime when the provider did not report an expiry.
pub const DEFAULT_ACCESS_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;
/// Refresh cookie lifetime, independent of the access token expiry.
pub const REFRESH_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;

const DEFAULT_COOKIE_PATH: &str = "/";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CookieSameSite {
    Strict,
    Lax,
    None,
}

impl CookieSameSite {
    /// Parse a `SameSite` value as accepted on the command line.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::None => "none",
        }
    }

    const fn to_cookie(self) -> SameSite {
        match self {
            Self::Strict => SameSite::Strict,
            Self::Lax => SameSite::Lax,
            Self::None => SameSite::None,
        }
    }
}

/// Attributes applied to every session cookie.
///
/// `Max-Age` is not part of the configuration: it is decided per cookie by
/// [`access_max_age`] and [`REFRESH_MAX_AGE_SECONDS`].
#[derive(Clone, Debug)]
pub struct CookieConfig {
    path: String,
    http_only: bool,
    same_site: CookieSameSite,
    secure: bool,
}

impl CookieConfig {
    /// `Path=/`, `HttpOnly`, `SameSite=Lax`, and `Secure` only when requested.
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self {
            path: DEFAULT_COOKIE_PATH.to_string(),
            http_only: true,
            same_site: CookieSameSite::Lax,
            secure,
        }
    }

    /// Browsers drop `SameSite=None` cookies without `Secure`, so `None`
    /// always turns `Secure` on.
    #[must_use]
    pub fn with_same_site(mut self, same_site: CookieSameSite) -> Self {
        if same_site == CookieSameSite::None && !self.secure {
            warn!("SameSite=None requires Secure cookies, enabling Secure");
            self.secure = true;
        }
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn same_site(&self) -> CookieSameSite {
        self.same_site
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Build a cookie carrying `value` for `max_age_seconds`.
    #[must_use]
    pub fn build(&self, name: &str, value: &str, max_age_seconds: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site.to_cookie())
            .max_age(Duration::seconds(max_age_seconds.max(0)))
            .build()
    }

    /// Build an expired, empty cookie that removes `name` from the browser.
    #[must_use]
    pub fn removal(&self, name: &str) -> Cookie<'static> {
        Cookie::build((name.to_string(), String::new()))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site.to_cookie())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// Both session cookies for `pair`, access first.
    #[must_use]
    pub fn session_cookies(&self, pair: &TokenPair, now: i64) -> [Cookie<'static>; 2] {
        [
            self.build(
                ACCESS_COOKIE_NAME,
                pair.access_token.expose_secret(),
                access_max_age(pair.expires_at, now),
            ),
            self.build(
                REFRESH_COOKIE_NAME,
                pair.refresh_token.expose_secret(),
                REFRESH_MAX_AGE_SECONDS,
            ),
        ]
    }

    /// Removal cookies for both session cookies.
    #[must_use]
    pub fn clear_session_cookies(&self) -> [Cookie<'static>; 2] {
        [
            self.removal(ACCESS_COOKIE_NAME),
            self.removal(REFRESH_COOKIE_NAME),
        ]
    }
}

/// Seconds until `expires_at`, floored at zero, or one day when unknown.
#[must_use]
pub fn access_max_age(expires_at: Option<i64>, now: i64) -> i64 {
    expires_at.map_or(DEFAULT_ACCESS_MAX_AGE_SECONDS, |expires_at| {
        expires_at.saturating_sub(now).max(0)
    })
}
