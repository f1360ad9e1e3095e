//! Comment endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::{AppState, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::types::{TaskComment, UserSummary};

/// Comment as serialized to clients, with nested author details.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub task_id: i64,
    pub author: UserSummary,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

fn comment_response(state: &AppState, comment: TaskComment) -> ApiResult<CommentResponse> {
    let author = state
        .db()
        .get_user(comment.author_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::user_not_found(comment.author_id))?;

    Ok(CommentResponse {
        id: comment.id,
        task_id: comment.task_id,
        author: UserSummary::from(&author),
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

/// POST /api/tasks/{task_id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let comment = state
        .db()
        .create_comment(task_id, user.0.id, &body.content)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(comment_response(&state, comment)?)))
}

/// GET /api/tasks/{task_id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = state
        .db()
        .list_comments(task_id, user.0.id)
        .map_err(ApiError::from)?;

    let mut out = Vec::with_capacity(comments.len());
    for comment in comments {
        out.push(comment_response(&state, comment)?);
    }

    Ok(Json(out))
}

/// PATCH /api/tasks/{task_id}/comments/{comment_id}
pub async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<CommentBody>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = state
        .db()
        .update_comment(task_id, comment_id, user.0.id, &body.content)
        .map_err(ApiError::from)?;

    Ok(Json(comment_response(&state, comment)?))
}

/// DELETE /api/tasks/{task_id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, comment_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_comment(task_id, comment_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
