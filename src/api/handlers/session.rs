//! Token exchange: turns provider-issued codes, email-link hashes and token
//! pairs into session cookies.
//!
//! Both methods live on `/api/auth/session`:
//!
//! - `GET ?code=...` or `GET ?token_hash=...&type=...` is where email links
//!   land. On success the browser is sent on with a `303`. Codes need the
//!   PKCE verifier, from `code_verifier` or the `sb-code-verifier` cookie.
//! - `POST` with a JSON token pair is the hand-off from client-side sign-in.
//!
//! A failed exchange never sets cookies.

use crate::{
    api::{
        error::{ApiError, OkBody},
        handlers::is_safe_redirect,
        state::AppState,
    },
    identity::{IdentityClient, IdentityError, RequestCookies},
    session::{CODE_VERIFIER_COOKIE_NAME, TokenPair},
};
use axum::{
    Json,
    extract::{Extension, Query, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::{IntoParams, ToSchema};

/// Credential presented for exchange.
#[derive(Debug)]
pub enum ExchangeGrant {
    /// One-time authorization code from an email link, with its PKCE verifier.
    Code { code: String, code_verifier: String },
    /// Email-link OTP hash with its type (`recovery`, `signup`, `magiclink`, ...).
    TokenHash { token_hash: String, kind: String },
    /// Token pair obtained by the browser. No upstream call.
    Tokens(TokenPair),
}

/// Resolve a grant into a token pair.
///
/// Code and token-hash grants are verified server to server with the
/// privileged credential.
/// # Errors
/// Returns the provider error when the grant is rejected or the service is unreachable.
pub async fn exchange_session(
    client: &IdentityClient,
    grant: ExchangeGrant,
) -> Result<TokenPair, IdentityError> {
    match grant {
        ExchangeGrant::Code {
            code,
            code_verifier,
        } => client.exchange_code(&code, &code_verifier).await,
        ExchangeGrant::TokenHash { token_hash, kind } => {
            client.verify_token_hash(&token_hash, &kind).await
        }
        ExchangeGrant::Tokens(pair) => Ok(pair),
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct TokenHandoff {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    /// Access token expiry as unix seconds, fractions are floored.
    expires_at: Option<f64>,
}

impl TokenHandoff {
    fn into_grant(self) -> Result<ExchangeGrant, ApiError> {
        let access_token = self.access_token.trim();
        let refresh_token = self.refresh_token.trim();
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(ApiError::bad_request(
                "access_token and refresh_token are required",
            ));
        }

        Ok(ExchangeGrant::Tokens(TokenPair::new(
            access_token.to_string(),
            refresh_token.to_string(),
            self.expires_at.and_then(unix_seconds),
        )))
    }
}

// `as` saturates out-of-range floats, NaN and infinities are dropped.
#[allow(clippy::cast_possible_truncation)]
fn unix_seconds(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.floor() as i64)
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ExchangeQuery {
    /// Authorization code.
    code: Option<String>,
    /// Email-link token hash, used together with `type`.
    token_hash: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    /// PKCE verifier for `code`, falls back to the `sb-code-verifier` cookie.
    code_verifier: Option<String>,
    /// Relative path to continue to after the exchange.
    next: Option<String>,
}

impl ExchangeQuery {
    fn grant(&self, stored_verifier: Option<&str>) -> Result<ExchangeGrant, ApiError> {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };

        if let Some(code) = non_empty(&self.code) {
            let code_verifier = non_empty(&self.code_verifier)
                .or_else(|| non_empty(&stored_verifier.map(ToString::to_string)))
                .ok_or_else(|| ApiError::bad_request("code_verifier is required with code"))?;
            return Ok(ExchangeGrant::Code {
                code,
                code_verifier,
            });
        }

        match (non_empty(&self.token_hash), non_empty(&self.kind)) {
            (Some(token_hash), Some(kind)) => Ok(ExchangeGrant::TokenHash { token_hash, kind }),
            _ => Err(ApiError::bad_request(
                "code or token_hash and type are required",
            )),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/session",
    request_body = TokenHandoff,
    responses(
        (status = 200, description = "Session cookies set", body = OkBody),
        (status = 400, description = "Missing access_token or refresh_token", body = crate::api::error::ErrorBody)
    ),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn store_session(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<TokenHandoff>, JsonRejection>,
) -> impl IntoResponse {
    let handoff = match payload {
        Ok(Json(handoff)) => handoff,
        Err(rejection) => {
            debug!("invalid token hand-off: {rejection}");
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };

    let grant = match handoff.into_grant() {
        Ok(grant) => grant,
        Err(err) => return err.into_response(),
    };

    let mut client = state.action_client(&headers);
    match exchange_session(client.identity_client(), grant).await {
        Ok(pair) => {
            client.store_session(&pair);
            (client.into_store(), Json(OkBody::new())).into_response()
        }
        Err(err) => {
            error!("token hand-off failed: {err}");
            ApiError::upstream(&err).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    params(ExchangeQuery),
    responses(
        (status = 303, description = "Session cookies set, redirecting to `next` or the post-reset URL"),
        (status = 400, description = "Neither code with its verifier nor token_hash and type were given", body = crate::api::error::ErrorBody),
        (status = 500, description = "The identity service rejected the exchange", body = crate::api::error::ErrorBody)
    ),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn exchange_link(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ExchangeQuery>,
) -> impl IntoResponse {
    let stored = RequestCookies::from_headers(&headers);
    let grant = match query.grant(stored.get(CODE_VERIFIER_COOKIE_NAME)) {
        Ok(grant) => grant,
        Err(err) => return err.into_response(),
    };

    let destination = query
        .next
        .as_deref()
        .filter(|next| is_safe_redirect(next))
        .unwrap_or_else(|| state.reset_redirect_url())
        .to_string();

    let mut client = state.action_client(&headers);
    match exchange_session(client.identity_client(), grant).await {
        Ok(pair) => {
            client.store_session(&pair);
            debug!(destination = %destination, "session exchanged");
            (client.into_store(), Redirect::to(&destination)).into_response()
        }
        Err(err) => {
            error!("session exchange failed: {err}");
            ApiError::upstream(&err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_requires_both_tokens() {
        let handoff = TokenHandoff {
            access_token: "access".to_string(),
            refresh_token: "  ".to_string(),
            expires_at: None,
        };
        assert!(handoff.into_grant().is_err());

        let handoff = TokenHandoff {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Some(42.0),
        };
        assert!(matches!(
            handoff.into_grant(),
            Ok(ExchangeGrant::Tokens(ref pair)) if pair.expires_at == Some(42)
        ));
    }

    #[test]
    fn fractional_expiry_is_floored() {
        assert_eq!(unix_seconds(1_700_003_600.75), Some(1_700_003_600));
        assert_eq!(unix_seconds(-0.5), Some(-1));
        assert_eq!(unix_seconds(f64::NAN), None);
        assert_eq!(unix_seconds(f64::INFINITY), None);
        assert_eq!(unix_seconds(1e300), Some(i64::MAX));

        let handoff: TokenHandoff = serde_json::from_value(serde_json::json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "expires_at": 1_700_003_600.5
        }))
        .unwrap_or_else(|err| panic!("hand-off should parse: {err}"));
        assert!(matches!(
            handoff.into_grant(),
            Ok(ExchangeGrant::Tokens(ref pair)) if pair.expires_at == Some(1_700_003_600)
        ));
    }

    #[test]
    fn query_prefers_code_then_token_hash() {
        let query = ExchangeQuery {
            code: Some("code-1".to_string()),
            token_hash: Some("hash".to_string()),
            kind: Some("recovery".to_string()),
            code_verifier: Some("verifier-1".to_string()),
            next: None,
        };
        assert!(matches!(
            query.grant(None),
            Ok(ExchangeGrant::Code { ref code, ref code_verifier })
                if code == "code-1" && code_verifier == "verifier-1"
        ));

        let query = ExchangeQuery {
            token_hash: Some("hash".to_string()),
            kind: Some("recovery".to_string()),
            ..ExchangeQuery::default()
        };
        assert!(matches!(
            query.grant(None),
            Ok(ExchangeGrant::TokenHash { ref token_hash, ref kind }) if token_hash == "hash" && kind == "recovery"
        ));

        let query = ExchangeQuery {
            token_hash: Some("hash".to_string()),
            ..ExchangeQuery::default()
        };
        assert!(query.grant(None).is_err());
        assert!(ExchangeQuery::default().grant(None).is_err());
    }

    #[test]
    fn code_verifier_from_query_or_cookie() {
        let query = ExchangeQuery {
            code: Some("code-1".to_string()),
            ..ExchangeQuery::default()
        };
        assert!(matches!(
            query.grant(None),
            Err(ref err) if err.status() == axum::http::StatusCode::BAD_REQUEST
        ));
        assert!(query.grant(Some("  ")).is_err());
        assert!(matches!(
            query.grant(Some("from-cookie")),
            Ok(ExchangeGrant::Code { ref code_verifier, .. }) if code_verifier == "from-cookie"
        ));

        let query = ExchangeQuery {
            code: Some("code-1".to_string()),
            code_verifier: Some("from-query".to_string()),
            ..ExchangeQuery::default()
        };
        assert!(matches!(
            query.grant(Some("from-cookie")),
            Ok(ExchangeGrant::Code { ref code_verifier, .. }) if code_verifier == "from-query"
        ));
    }

    #[tokio::test]
    async fn token_grant_needs_no_upstream() -> anyhow::Result<()> {
        let client = IdentityClient::new(
            "http://127.0.0.1:9",
            secrecy::SecretString::from("anon".to_string()),
            secrecy::SecretString::from("service".to_string()),
        )?;
        let pair = exchange_session(
            &client,
            ExchangeGrant::Tokens(TokenPair::new("a".into(), "r".into(), None)),
        )
        .await?;
        assert_eq!(pair.expires_at, None);
        Ok(())
    }
}
