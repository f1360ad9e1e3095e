//! Dependency endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::tasks::{task_response, TaskResponse};
use super::{AppState, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::types::{TaskDependency, TaskSummary, UserSummary};

/// Dependency edge as serialized to clients, with nested task
/// summaries for both endpoints and the creator.
#[derive(Debug, Serialize)]
pub struct DependencyResponse {
    pub id: i64,
    pub task: TaskSummary,
    pub depends_on: TaskSummary,
    pub created_by: UserSummary,
    pub notes: String,
    pub active: bool,
    pub created_at: i64,
}

fn dependency_response(state: &AppState, dep: TaskDependency) -> ApiResult<DependencyResponse> {
    let task = state
        .db()
        .get_task_unchecked(dep.task_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::task_not_found(dep.task_id))?;
    let depends_on = state
        .db()
        .get_task_unchecked(dep.depends_on_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::task_not_found(dep.depends_on_id))?;
    let created_by = state
        .db()
        .get_user(dep.created_by_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::user_not_found(dep.created_by_id))?;

    Ok(DependencyResponse {
        id: dep.id,
        task: TaskSummary::from(&task),
        depends_on: TaskSummary::from(&depends_on),
        created_by: UserSummary::from(&created_by),
        notes: dep.notes,
        active: dep.active,
        created_at: dep.created_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateDependencyBody {
    pub depends_on: i64,
    pub notes: Option<String>,
}

/// POST /api/tasks/{task_id}/dependencies
pub async fn create_dependency(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<CreateDependencyBody>,
) -> ApiResult<(StatusCode, Json<DependencyResponse>)> {
    let dep = state
        .db()
        .create_dependency(task_id, body.depends_on, user.0.id, body.notes)
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(dependency_response(&state, dep)?),
    ))
}

/// GET /api/tasks/{task_id}/dependencies
///
/// Lists active and inactive edges, newest first. Callers without
/// owner/assignee standing get an empty list, not an error.
pub async fn list_dependencies(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<DependencyResponse>>> {
    let deps = state
        .db()
        .list_dependencies(task_id, user.0.id)
        .map_err(ApiError::from)?;

    let mut out = Vec::with_capacity(deps.len());
    for dep in deps {
        out.push(dependency_response(&state, dep)?);
    }

    Ok(Json(out))
}

/// PATCH /api/tasks/{task_id}/dependencies/{dep_id}/toggle
pub async fn toggle_dependency(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, dep_id)): Path<(i64, i64)>,
) -> ApiResult<Json<DependencyResponse>> {
    let dep = state
        .db()
        .toggle_dependency(task_id, dep_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(Json(dependency_response(&state, dep)?))
}

/// DELETE /api/tasks/{task_id}/dependencies/{dep_id}
pub async fn delete_dependency(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, dep_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_dependency(task_id, dep_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tasks/{task_id}/blockers — tasks this task directly
/// depends on via active edges.
pub async fn blockers(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state
        .db()
        .blockers_of(task_id, user.0.id)
        .map_err(ApiError::from)?;

    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        out.push(task_response(state.db(), task)?);
    }

    Ok(Json(out))
}

/// GET /api/tasks/{task_id}/blocked — tasks directly blocked by this
/// task via active edges.
pub async fn blocked(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state
        .db()
        .blocked_by(task_id, user.0.id)
        .map_err(ApiError::from)?;

    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        out.push(task_response(state.db(), task)?);
    }

    Ok(Json(out))
}
