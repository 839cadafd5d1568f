use crate::{
    api::{
        error::{ApiError, ErrorBody},
        state::AppState,
    },
    identity::IdentityError,
    session::ROLE_ADMIN,
};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = String, Path, description = "Identity service user id")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Attempt to delete the signed-in user", body = ErrorBody),
        (status = 401, description = "No active session", body = ErrorBody),
        (status = 403, description = "Signed-in user is not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Identity service failure", body = ErrorBody)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn delete_user(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut client = state.action_client(&headers);
    let identity = client.identity().await;
    let cookies = client.into_store();

    let identity = match identity {
        Ok(identity) => identity,
        Err(err) => return (cookies, ApiError::from(err)).into_response(),
    };

    if !identity.has_role(ROLE_ADMIN) {
        return (cookies, ApiError::forbidden("Admin role required")).into_response();
    }

    if identity.id == id {
        return (
            cookies,
            ApiError::bad_request("Cannot delete the signed-in user"),
        )
            .into_response();
    }

    match state.identity().delete_user(&id).await {
        Ok(()) => {
            info!(admin = %identity.id, user_id = %id, "user deleted");
            (StatusCode::NO_CONTENT, cookies, ()).into_response()
        }
        Err(IdentityError::Rejected { status, message }) if status == StatusCode::NOT_FOUND => {
            (cookies, ApiError::new(StatusCode::NOT_FOUND, message)).into_response()
        }
        Err(err) => {
            error!("failed to delete user {id}: {err}");
            (cookies, ApiError::upstream(&err)).into_response()
        }
    }
}
