//! Session lifecycle: password sign-in, sign-up, password recovery and
//! update, sign-out.

use crate::{
    api::{
        error::{ApiError, ErrorBody, OkBody},
        handlers::{is_safe_redirect, valid_email},
        state::AppState,
    },
    identity::SignUpOutcome,
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
    /// Relative path to continue to; anything else falls back to the landing page.
    redirect_to: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    ok: bool,
    redirect_to: String,
}

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    ok: bool,
    /// The account exists but must be confirmed from the email link first.
    confirmation_required: bool,
}

#[derive(ToSchema, Deserialize)]
pub struct RecoverRequest {
    email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct PasswordRequest {
    password: String,
}

/// Unwrap a JSON body or answer `400` with the rejection reason.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn credentials(email: &str, password: String) -> Result<(String, SecretString), ApiError> {
    let email = email.trim().to_lowercase();
    if !valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    Ok((email, SecretString::from(password)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, session cookies set", body = LoginResponse),
        (status = 400, description = "Malformed email or missing fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let (email, password) = match credentials(&request.email, request.password) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };

    let mut client = state.action_client(&headers);
    if let Err(err) = client.sign_in_with_password(&email, &password).await {
        debug!("sign-in failed: {err}");
        return ApiError::from(err).into_response();
    }

    let redirect_to = request
        .redirect_to
        .filter(|target| is_safe_redirect(target))
        .unwrap_or_else(|| state.gate().landing_path().to_string());

    (
        client.into_store(),
        Json(LoginResponse {
            ok: true,
            redirect_to,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Malformed email, missing fields or refused by the identity service", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let (email, password) = match credentials(&request.email, request.password) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };

    let mut client = state.action_client(&headers);
    let outcome = match client.identity_client().sign_up(&email, &password).await {
        Ok(outcome) => outcome,
        Err(err) if err.is_rejection() => {
            // Sign-up refusals (weak password, duplicate email) are input errors.
            return ApiError::bad_request(err.to_string()).into_response();
        }
        Err(err) => {
            error!("sign-up failed: {err}");
            return ApiError::from(err).into_response();
        }
    };

    let confirmation_required = match outcome {
        SignUpOutcome::Session(pair) => {
            client.store_session(&pair);
            false
        }
        SignUpOutcome::ConfirmationRequired { user_id } => {
            debug!(user_id = %user_id, "sign-up awaiting email confirmation");
            true
        }
    };

    (
        StatusCode::CREATED,
        client.into_store(),
        Json(RegisterResponse {
            ok: true,
            confirmation_required,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/recover",
    request_body = RecoverRequest,
    responses(
        (status = 200, description = "Recovery email requested", body = OkBody),
        (status = 400, description = "Malformed email", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn recover(
    state: Extension<Arc<AppState>>,
    payload: Result<Json<RecoverRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let email = request.email.trim().to_lowercase();
    if !valid_email(&email) {
        return ApiError::bad_request("Invalid email").into_response();
    }

    match state
        .identity()
        .recover_password(&email, state.reset_redirect_url())
        .await
    {
        Ok(()) => Json(OkBody::new()).into_response(),
        Err(err) => {
            error!("password recovery failed: {err}");
            ApiError::from(err).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/password",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = OkBody),
        (status = 400, description = "Missing password", body = ErrorBody),
        (status = 401, description = "No active session", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn password(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    if request.password.is_empty() {
        return ApiError::bad_request("Password is required").into_response();
    }
    let password = SecretString::from(request.password);

    let mut client = state.action_client(&headers);
    let result = client.update_password(&password).await;
    // A refresh during the update still has to reach the browser.
    let cookies = client.into_store();

    match result {
        Ok(()) => (cookies, Json(OkBody::new())).into_response(),
        Err(err) => {
            debug!("password update failed: {err}");
            (cookies, ApiError::from(err)).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cookies cleared")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(state: Extension<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let mut client = state.action_client(&headers);
    if let Err(err) = client.sign_out().await {
        warn!("provider sign-out failed, clearing cookies anyway: {err}");
    }
    (StatusCode::NO_CONTENT, client.into_store(), ()).into_response()
}
