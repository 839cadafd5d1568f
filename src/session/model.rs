//! Token pair, session and identity types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Role granted full administrative access.
pub const ROLE_ADMIN: &str = "admin";

/// Current time as unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Tokens issued by the identity provider after a successful exchange.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Access token expiry as unix seconds, when known.
    pub expires_at: Option<i64>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_at: Option<i64>) -> Self {
        Self {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at,
        }
    }
}

/// Session read back from the request cookies.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl Session {
    /// Build a session from raw cookie values.
    ///
    /// Returns `None` unless both tokens are present and non-empty.
    #[must_use]
    pub fn from_parts(access_token: Option<&str>, refresh_token: Option<&str>) -> Option<Self> {
        let access_token = access_token.map(str::trim).filter(|v| !v.is_empty())?;
        let refresh_token = refresh_token.map(str::trim).filter(|v| !v.is_empty())?;
        Some(Self {
            access_token: SecretString::from(access_token.to_string()),
            refresh_token: SecretString::from(refresh_token.to_string()),
        })
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
    }
}

/// The signed-in user as seen by the back office.
///
/// Looked up from the identity service on every request and never cached.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    /// Free-text role from the user's profile row, if one was found.
    pub role: Option<String>,
}

impl Identity {
    /// Case-insensitive role check. Users without a profile role match nothing.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|current| current.trim().eq_ignore_ascii_case(role))
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}
