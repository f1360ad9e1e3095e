//! Checklist endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::{AppState, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::types::ChecklistItem;

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    pub text: String,
}

/// POST /api/tasks/{task_id}/checklist
pub async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<CreateItemBody>,
) -> ApiResult<(StatusCode, Json<ChecklistItem>)> {
    let item = state
        .db()
        .create_checklist_item(task_id, user.0.id, &body.text)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/tasks/{task_id}/checklist
pub async fn list_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<ChecklistItem>>> {
    let items = state
        .db()
        .list_checklist_items(task_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub text: Option<String>,
    pub is_completed: Option<bool>,
}

/// PATCH /api/tasks/{task_id}/checklist/{item_id}
pub async fn update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, item_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateItemBody>,
) -> ApiResult<Json<ChecklistItem>> {
    let item = state
        .db()
        .update_checklist_item(task_id, item_id, user.0.id, body.text, body.is_completed)
        .map_err(ApiError::from)?;

    Ok(Json(item))
}

/// DELETE /api/tasks/{task_id}/checklist/{item_id}
pub async fn delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, item_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_checklist_item(task_id, item_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub item_ids: Vec<i64>,
}

/// POST /api/tasks/{task_id}/checklist/reorder
pub async fn reorder(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Json<Vec<ChecklistItem>>> {
    let items = state
        .db()
        .reorder_checklist(task_id, user.0.id, &body.item_ids)
        .map_err(ApiError::from)?;

    Ok(Json(items))
}
