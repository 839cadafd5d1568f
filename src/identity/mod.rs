//! Identity service access.
//!
//! [`IdentityClient`] talks to the hosted auth and data APIs. A
//! [`SessionClient`] binds it to the cookies of a single request through a
//! [`CookieStore`]:
//!
//! - render paths get [`ReadOnlyCookies`] and can never change cookies;
//! - mutating paths (token exchange, gate, lifecycle endpoints) get
//!   [`ResponseCookies`], whose writes become `Set-Cookie` headers.

pub mod client;
pub mod cookies;
pub mod error;
pub mod session_client;

pub use self::client::{IdentityClient, SignUpOutcome, User};
pub use self::cookies::{CookieStore, ReadOnlyCookies, RequestCookies, ResponseCookies};
pub use self::error::IdentityError;
pub use self::session_client::SessionClient;
