//! HTTP client for the hosted identity and data service.
//!
//! Auth calls go to the GoTrue-compatible `/auth/v1` API, profile lookups to
//! the PostgREST-compatible `/rest/v1` API. Calls made on behalf of a visitor
//! carry the public key plus the visitor's access token, so row-level security
//! applies. Code exchange, email-link verification and user deletion use the
//! privileged service key and must never run with visitor-supplied credentials.

use crate::session::model::{TokenPair, unix_now};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{Instrument, Span, debug, info_span};
use url::Url;

use super::error::IdentityError;

const API_KEY_HEADER: &str = "apikey";
const PROFILES_PATH: &str = "rest/v1/profiles";

/// User record returned by the identity service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_pair(self, now: i64) -> TokenPair {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|seconds| now.saturating_add(seconds)));
        TokenPair::new(self.access_token, self.refresh_token, expires_at)
    }
}

#[derive(Deserialize)]
struct ProfileRow {
    role: Option<String>,
}

/// Result of a sign-up request.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled and the provider issued a session.
    Session(TokenPair),
    /// The user must follow the confirmation link before signing in.
    ConfirmationRequired { user_id: String },
}

#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    base_url: Url,
    anon_key: SecretString,
    service_key: SecretString,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"***")
            .field("service_key", &"***")
            .finish()
    }
}

impl IdentityClient {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        anon_key: SecretString,
        service_key: SecretString,
    ) -> Result<Self, IdentityError> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        // Relative joins only keep the last path segment when it ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            anon_key,
            service_key,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(self.base_url.join(path)?)
    }

    fn public(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.anon_key.expose_secret())
    }

    fn privileged(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
    }

    /// Resolve an access token into its user.
    /// # Errors
    /// Returns an error if the token is rejected or the service is unreachable.
    pub async fn get_user(&self, access_token: &SecretString) -> Result<User, IdentityError> {
        let url = self.endpoint("auth/v1/user")?;
        let span = info_span!("identity.get_user", http.method = "GET", url = %url);
        let request = self
            .public(self.http.get(url))
            .bearer_auth(access_token.expose_secret());

        read_json(send(request, span).await?).await
    }

    /// Trade a refresh token for a rotated token pair.
    /// # Errors
    /// Returns an error if the refresh token is rejected or the service is unreachable.
    pub async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<TokenPair, IdentityError> {
        let url = self.endpoint("auth/v1/token")?;
        let span = info_span!("identity.refresh_session", http.method = "POST", url = %url);
        let request = self
            .public(self.http.post(url))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));

        token_pair(send(request, span).await?).await
    }

    /// # Errors
    /// Returns an error if the credentials are rejected or the service is unreachable.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenPair, IdentityError> {
        let url = self.endpoint("auth/v1/token")?;
        let span = info_span!("identity.sign_in", http.method = "POST", url = %url);
        let request = self
            .public(self.http.post(url))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        token_pair(send(request, span).await?).await
    }

    /// # Errors
    /// Returns an error if the provider refuses the registration or is unreachable.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, IdentityError> {
        let url = self.endpoint("auth/v1/signup")?;
        let span = info_span!("identity.sign_up", http.method = "POST", url = %url);
        let request = self
            .public(self.http.post(url))
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        let body: Value = read_json(send(request, span).await?).await?;
        sign_up_outcome(body, unix_now())
    }

    /// Exchange a one-time authorization code from an email link together
    /// with the PKCE verifier of the browser that started the flow.
    /// # Errors
    /// Returns an error if the code is rejected or the service is unreachable.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenPair, IdentityError> {
        let url = self.endpoint("auth/v1/token")?;
        let span = info_span!("identity.exchange_code", http.method = "POST", url = %url);
        let request = self
            .privileged(self.http.post(url))
            .query(&[("grant_type", "pkce")])
            .json(&json!({ "auth_code": code, "code_verifier": code_verifier }));

        token_pair(send(request, span).await?).await
    }

    /// Verify an email-link token hash (`recovery`, `signup`, `magiclink`...).
    /// # Errors
    /// Returns an error if the hash is rejected or the service is unreachable.
    pub async fn verify_token_hash(
        &self,
        token_hash: &str,
        kind: &str,
    ) -> Result<TokenPair, IdentityError> {
        let url = self.endpoint("auth/v1/verify")?;
        let span = info_span!("identity.verify_token_hash", http.method = "POST", url = %url, otp.type = kind);
        let request = self
            .privileged(self.http.post(url))
            .json(&json!({ "type": kind, "token_hash": token_hash }));

        token_pair(send(request, span).await?).await
    }

    /// Send a password-reset email whose link lands on `redirect_to`.
    /// # Errors
    /// Returns an error if the provider refuses the request or is unreachable.
    pub async fn recover_password(&self, email: &str, redirect_to: &str) -> Result<(), IdentityError> {
        let url = self.endpoint("auth/v1/recover")?;
        let span = info_span!("identity.recover_password", http.method = "POST", url = %url);
        let request = self
            .public(self.http.post(url))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));

        send(request, span).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the access token is rejected or the service is unreachable.
    pub async fn update_password(
        &self,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), IdentityError> {
        let url = self.endpoint("auth/v1/user")?;
        let span = info_span!("identity.update_password", http.method = "PUT", url = %url);
        let request = self
            .public(self.http.put(url))
            .bearer_auth(access_token.expose_secret())
            .json(&json!({ "password": password.expose_secret() }));

        send(request, span).await?;
        Ok(())
    }

    /// Revoke the refresh tokens behind `access_token`.
    /// # Errors
    /// Returns an error if the service rejects the token or is unreachable.
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError> {
        let url = self.endpoint("auth/v1/logout")?;
        let span = info_span!("identity.sign_out", http.method = "POST", url = %url);
        let request = self
            .public(self.http.post(url))
            .bearer_auth(access_token.expose_secret());

        send(request, span).await?;
        Ok(())
    }

    /// Read the `role` column of the user's profile row.
    ///
    /// Runs with the visitor's token so the row-level security policies of
    /// the `profiles` table decide what is visible.
    /// # Errors
    /// Returns an error if the query fails or the service is unreachable.
    pub async fn fetch_role(
        &self,
        access_token: &SecretString,
        user_id: &str,
    ) -> Result<Option<String>, IdentityError> {
        let url = self.endpoint(PROFILES_PATH)?;
        let span = info_span!("identity.fetch_role", http.method = "GET", url = %url);
        let request = self
            .public(self.http.get(url))
            .bearer_auth(access_token.expose_secret())
            .query(&[("id", format!("eq.{user_id}")), ("select", "role".to_string())]);

        let rows: Vec<ProfileRow> = read_json(send(request, span).await?).await?;
        Ok(rows.into_iter().next().and_then(|row| row.role))
    }

    /// Delete a user account with the privileged key.
    /// # Errors
    /// Returns an error if the provider refuses the deletion or is unreachable.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let mut url = self.endpoint("auth/v1/admin/users")?;
        url.path_segments_mut()
            .map_err(|()| {
                IdentityError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .push(user_id);
        let span = info_span!("identity.delete_user", http.method = "DELETE", url = %url);
        let request = self.privileged(self.http.delete(url));

        send(request, span).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the health endpoint does not answer with success.
    pub async fn health(&self) -> Result<(), IdentityError> {
        let url = self.endpoint("auth/v1/health")?;
        let span = info_span!("identity.health", http.method = "GET", url = %url);
        let request = self.public(self.http.get(url));

        send(request, span).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder, span: Span) -> Result<Response, IdentityError> {
    let response = request.send().instrument(span).await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = provider_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("identity service error")
            .to_string()
    });
    debug!(%status, %message, "identity service rejected request");

    Err(IdentityError::Rejected { status, message })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| IdentityError::InvalidResponse(err.to_string()))
}

async fn token_pair(response: Response) -> Result<TokenPair, IdentityError> {
    let tokens: TokenResponse = read_json(response).await?;
    Ok(tokens.into_pair(unix_now()))
}

fn sign_up_outcome(body: Value, now: i64) -> Result<SignUpOutcome, IdentityError> {
    if body.get("access_token").is_some() {
        let tokens: TokenResponse = serde_json::from_value(body)
            .map_err(|err| IdentityError::InvalidResponse(err.to_string()))?;
        return Ok(SignUpOutcome::Session(tokens.into_pair(now)));
    }

    body.get("id")
        .or_else(|| body.get("user").and_then(|user| user.get("id")))
        .and_then(Value::as_str)
        .map(|id| SignUpOutcome::ConfirmationRequired {
            user_id: id.to_string(),
        })
        .ok_or_else(|| IdentityError::InvalidResponse("no user id in sign-up response".to_string()))
}

/// The provider reports errors under several keys depending on the endpoint.
fn provider_error_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(ToString::to_string)
}
