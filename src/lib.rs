//! # Gatehouse (session gate for the back office)
//!
//! `gatehouse` sits between the browser and the back-office pages and bridges
//! the sessions of a hosted identity service (GoTrue-compatible auth API plus
//! a PostgREST-style data API) into HTTP-only cookies.
//!
//! ## Sessions
//!
//! A session is the provider's access/refresh token pair stored as two
//! cookies, `sb-access-token` and `sb-refresh-token`. Both are written
//! together or not at all; a visitor holding only one of them has no session.
//! Access tokens rejected by the provider are refreshed once per request and
//! the rotated pair is written back on the response.
//!
//! ## Session gate
//!
//! Every request is classified as public, guest-only or protected (see
//! [`api::gate`]). Protected pages without a valid session redirect to the
//! login page with `redirect_to` set; guest-only pages redirect signed-in
//! visitors to the landing page.
//!
//! ## Token exchange
//!
//! `/api/auth/session` turns authorization codes, email-link token hashes and
//! client-side token pairs into session cookies. Codes and hashes are verified
//! server to server with the privileged service key.
//!
//! ## Client contexts
//!
//! Render paths get a read-only cookie context whose writes are ignored;
//! mutating paths get a context whose writes become `Set-Cookie` headers.
//! Roles come from the `profiles` table and are compared case-insensitively.

pub mod api;
pub mod cli;
pub mod identity;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
