use crate::{
    api::{
        error::{ApiError, ErrorBody},
        state::AppState,
    },
    session::Identity,
};
use axum::{Json, extract::Extension, http::HeaderMap};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Signed-in user", body = Identity),
        (status = 401, description = "No active session", body = ErrorBody)
    ),
    tag = "dashboard"
)]
// render path: the gate has already resolved the identity, read-only lookup otherwise
#[instrument(skip_all)]
pub async fn dashboard(
    state: Extension<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
) -> Result<Json<Identity>, ApiError> {
    if let Some(Extension(identity)) = identity {
        return Ok(Json(identity));
    }
    let mut client = state.render_client(&headers);
    Ok(Json(client.identity().await?))
}
