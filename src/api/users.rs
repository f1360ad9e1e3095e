//! User endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::{AppState, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::types::User;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub username: String,
    pub email: String,
}

/// POST /api/users — register an identity. Open endpoint: the
/// external auth collaborator calls this after its own registration
/// flow, so no principal is required.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .db()
        .create_user(&body.username, &body.email)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/me — the authenticated principal.
pub async fn me(user: CurrentUser) -> Json<User> {
    Json(user.0)
}

/// GET /api/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = state
        .db()
        .get_user(user_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::user_not_found(user_id))?;

    Ok(Json(user))
}
