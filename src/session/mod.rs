//! Session model and cookie persistence.
//!
//! A session is a provider-issued token pair stored as two cookies:
//!
//! - `sb-access-token`: lives until the access token expires, or one day when
//!   the provider did not report an expiry.
//! - `sb-refresh-token`: fixed 30 day lifetime.
//!
//! Both cookies are written together or not at all. Readers that only find one
//! of them treat the visitor as having no session.

pub mod cookies;
pub mod model;

pub use self::cookies::{
    ACCESS_COOKIE_NAME, CODE_VERIFIER_COOKIE_NAME, CookieConfig, CookieSameSite,
    DEFAULT_ACCESS_MAX_AGE_SECONDS, REFRESH_COOKIE_NAME, REFRESH_MAX_AGE_SECONDS, access_max_age,
};
pub use self::model::{Identity, ROLE_ADMIN, Session, TokenPair, unix_now};
