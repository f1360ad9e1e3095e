//! Task CRUD and list operations.

use super::users::get_user_internal;
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{encode_tags, parse_tags, Priority, Task, TaskStatus};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};

/// Filters for task list queries. All fields are optional and combine
/// with AND; the owner-or-assignee visibility scope is always applied.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub owner_id: Option<i64>,
    pub assignee_id: Option<i64>,
    /// Case-insensitive substring match over title and description.
    pub search: Option<String>,
    /// Ordering field, optionally prefixed with '-' for descending:
    /// created_at, due_date, priority. Default is -created_at.
    pub ordering: Option<String>,
}

/// Build an ORDER BY clause from the ordering parameter.
/// Returns a safe SQL ORDER BY expression.
fn build_order_clause(ordering: Option<&str>) -> String {
    let raw = ordering.unwrap_or("-created_at");
    let (field, desc) = match raw.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };

    let expr = match field {
        "due_date" => "t.due_date",
        "priority" => {
            "CASE t.priority WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END"
        }
        _ => "t.created_at", // default
    };

    format!("{} {}", expr, if desc { "DESC" } else { "ASC" })
}

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let tags: String = row.get("tags")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Todo),
        priority: Priority::from_str(&priority).unwrap_or(Priority::Medium),
        owner_id: row.get("owner_id")?,
        assignee_id: row.get("assignee_id")?,
        created_at: row.get("created_at")?,
        due_date: row.get("due_date")?,
        tags: parse_tags(&tags),
        duration_hours: row.get("duration_hours")?,
    })
}

/// Internal helper to get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fetch a task the user may see. Foreign tasks are hidden, not
/// forbidden: the caller gets `TaskNotFound` either way.
pub(crate) fn get_visible_task(conn: &Connection, task_id: i64, user_id: i64) -> Result<Task> {
    let task = get_task_internal(conn, task_id)?
        .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;

    if !task.is_owner_or_assignee(user_id) {
        return Err(ApiError::task_not_found(task_id).into());
    }

    Ok(task)
}

/// Fetch a task for a mutating operation, failing hard with
/// `PermissionDenied` when the caller is neither owner nor assignee.
pub(crate) fn get_task_for_write(conn: &Connection, task_id: i64, user_id: i64) -> Result<Task> {
    let task = get_task_internal(conn, task_id)?
        .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;

    if !task.is_owner_or_assignee(user_id) {
        return Err(ApiError::permission_denied(task_id).into());
    }

    Ok(task)
}

impl Database {
    /// Create a new task owned by `owner_id`.
    /// The assignee defaults to the owner when not given.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
        status: Option<TaskStatus>,
        priority: Option<Priority>,
        assignee_id: Option<i64>,
        due_date: i64,
        tags: Option<Vec<String>>,
        duration_hours: Option<f64>,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::missing_field("title").into());
        }

        let status = status.unwrap_or(TaskStatus::Todo);
        let priority = priority.unwrap_or(Priority::Medium);
        let assignee_id = assignee_id.unwrap_or(owner_id);
        let tags = tags.unwrap_or_default();
        let now = now_ms();

        self.with_conn(|conn| {
            if get_user_internal(conn, assignee_id)?.is_none() {
                return Err(ApiError::user_not_found(assignee_id).into());
            }

            conn.execute(
                "INSERT INTO tasks (
                    title, description, status, priority,
                    owner_id, assignee_id, created_at, due_date, tags, duration_hours
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    title,
                    description,
                    status.as_str(),
                    priority.as_str(),
                    owner_id,
                    assignee_id,
                    now,
                    due_date,
                    encode_tags(&tags),
                    duration_hours,
                ],
            )?;

            Ok(Task {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                description: description.to_string(),
                status,
                priority,
                owner_id,
                assignee_id,
                created_at: now,
                due_date,
                tags,
                duration_hours,
            })
        })
    }

    /// Get a task as seen by a user. Tasks the user neither owns nor
    /// is assigned to are reported as not found.
    pub fn get_task(&self, task_id: i64, user_id: i64) -> Result<Task> {
        self.with_conn(|conn| get_visible_task(conn, task_id, user_id))
    }

    /// Get a task without a visibility check. Used when serializing
    /// the far end of a dependency edge the caller may already see.
    pub fn get_task_unchecked(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks visible to the user (owner or assignee), with
    /// optional filters, search, and ordering.
    pub fn list_tasks(&self, user_id: i64, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT t.* FROM tasks t WHERE (t.owner_id = ? OR t.assignee_id = ?)",
            );
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            params_vec.push(Box::new(user_id));
            params_vec.push(Box::new(user_id));

            if let Some(status) = filter.status {
                sql.push_str(" AND t.status = ?");
                params_vec.push(Box::new(status.as_str()));
            }

            if let Some(priority) = filter.priority {
                sql.push_str(" AND t.priority = ?");
                params_vec.push(Box::new(priority.as_str()));
            }

            if let Some(owner) = filter.owner_id {
                sql.push_str(" AND t.owner_id = ?");
                params_vec.push(Box::new(owner));
            }

            if let Some(assignee) = filter.assignee_id {
                sql.push_str(" AND t.assignee_id = ?");
                params_vec.push(Box::new(assignee));
            }

            if let Some(ref search) = filter.search {
                sql.push_str(" AND (t.title LIKE ? OR t.description LIKE ?)");
                let pattern = format!("%{}%", search);
                params_vec.push(Box::new(pattern.clone()));
                params_vec.push(Box::new(pattern));
            }

            let order_clause = build_order_clause(filter.ordering.as_deref());
            sql.push_str(&format!(" ORDER BY {}", order_clause));

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(tasks)
        })
    }

    /// Update a task. Owner or assignee only; unset fields keep their
    /// current values.
    #[allow(clippy::too_many_arguments)]
    pub fn update_task(
        &self,
        task_id: i64,
        user_id: i64,
        title: Option<String>,
        description: Option<String>,
        status: Option<TaskStatus>,
        priority: Option<Priority>,
        assignee_id: Option<i64>,
        due_date: Option<i64>,
        tags: Option<Vec<String>>,
        duration_hours: Option<Option<f64>>,
    ) -> Result<Task> {
        self.with_conn(|conn| {
            let task = get_visible_task(conn, task_id, user_id)?;

            let new_title = match title {
                Some(t) => {
                    let t = t.trim().to_string();
                    if t.is_empty() {
                        return Err(ApiError::missing_field("title").into());
                    }
                    t
                }
                None => task.title.clone(),
            };
            let new_description = description.unwrap_or(task.description.clone());
            let new_status = status.unwrap_or(task.status);
            let new_priority = priority.unwrap_or(task.priority);
            let new_assignee = assignee_id.unwrap_or(task.assignee_id);
            let new_due_date = due_date.unwrap_or(task.due_date);
            let new_tags = tags.unwrap_or(task.tags.clone());
            let new_duration = duration_hours.unwrap_or(task.duration_hours);

            if new_assignee != task.assignee_id
                && get_user_internal(conn, new_assignee)?.is_none()
            {
                return Err(ApiError::user_not_found(new_assignee).into());
            }

            conn.execute(
                "UPDATE tasks SET
                    title = ?1, description = ?2, status = ?3, priority = ?4,
                    assignee_id = ?5, due_date = ?6, tags = ?7, duration_hours = ?8
                WHERE id = ?9",
                params![
                    new_title,
                    new_description,
                    new_status.as_str(),
                    new_priority.as_str(),
                    new_assignee,
                    new_due_date,
                    encode_tags(&new_tags),
                    new_duration,
                    task_id,
                ],
            )?;

            Ok(Task {
                title: new_title,
                description: new_description,
                status: new_status,
                priority: new_priority,
                assignee_id: new_assignee,
                due_date: new_due_date,
                tags: new_tags,
                duration_hours: new_duration,
                ..task
            })
        })
    }

    /// Delete a task. Cascades to its comments, checklist items, and
    /// every dependency edge referencing it as source or target.
    pub fn delete_task(&self, task_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(())
        })
    }
}
