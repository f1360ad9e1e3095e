//! Task endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::{AppState, CurrentUser};
use crate::db::tasks::TaskFilter;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{Priority, Task, TaskStatus, UserSummary};

/// Task as serialized to clients, with nested owner/assignee details.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub owner: UserSummary,
    pub assignee: UserSummary,
    pub created_at: i64,
    pub due_date: i64,
    pub tags: Vec<String>,
    pub duration_hours: Option<f64>,
}

pub(crate) fn task_response(db: &Database, task: Task) -> ApiResult<TaskResponse> {
    let owner = db
        .get_user(task.owner_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::user_not_found(task.owner_id))?;
    let assignee = db
        .get_user(task.assignee_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::user_not_found(task.assignee_id))?;

    Ok(TaskResponse {
        id: task.id,
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        owner: UserSummary::from(&owner),
        assignee: UserSummary::from(&assignee),
        created_at: task.created_at,
        due_date: task.due_date,
        tags: task.tags,
        duration_hours: task.duration_hours,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<i64>,
    pub due_date: i64,
    pub tags: Option<Vec<String>>,
    pub duration_hours: Option<f64>,
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateTaskBody>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = state
        .db()
        .create_task(
            user.0.id,
            &body.title,
            &body.description,
            body.status,
            body.priority,
            body.assignee_id,
            body.due_date,
            body.tags,
            body.duration_hours,
        )
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(task_response(state.db(), task)?)))
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub owner: Option<i64>,
    pub assignee: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        owner_id: query.owner,
        assignee_id: query.assignee,
        search: query.search,
        ordering: query.ordering,
    };

    let tasks = state
        .db()
        .list_tasks(user.0.id, &filter)
        .map_err(ApiError::from)?;

    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        out.push(task_response(state.db(), task)?);
    }

    Ok(Json(out))
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .db()
        .get_task(task_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(Json(task_response(state.db(), task)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<i64>,
    pub due_date: Option<i64>,
    pub tags: Option<Vec<String>>,
    /// Double option: absent = keep, null = clear.
    #[serde(default, with = "double_option")]
    pub duration_hours: Option<Option<f64>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(de).map(Some)
    }
}

/// PATCH /api/tasks/{task_id}
pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<UpdateTaskBody>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .db()
        .update_task(
            task_id,
            user.0.id,
            body.title,
            body.description,
            body.status,
            body.priority,
            body.assignee_id,
            body.due_date,
            body.tags,
            body.duration_hours,
        )
        .map_err(ApiError::from)?;

    Ok(Json(task_response(state.db(), task)?))
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_task(task_id, user.0.id)
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
