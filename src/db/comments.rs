//! Task comment operations.

use super::tasks::{get_task_internal, get_visible_task};
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::TaskComment;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};

fn parse_comment_row(row: &Row) -> rusqlite::Result<TaskComment> {
    Ok(TaskComment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        author_id: row.get("author_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn get_comment_internal(conn: &Connection, comment_id: i64) -> Result<Option<TaskComment>> {
    let mut stmt = conn.prepare("SELECT * FROM task_comments WHERE id = ?1")?;

    let result = stmt.query_row(params![comment_id], parse_comment_row);

    match result {
        Ok(comment) => Ok(Some(comment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Add a comment to a task. Content must be non-empty after
    /// trimming; the author must be owner or assignee of the task.
    pub fn create_comment(&self, task_id: i64, author_id: i64, content: &str) -> Result<TaskComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::missing_field("content").into());
        }

        let now = now_ms();

        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(author_id) {
                return Err(ApiError::permission_denied(task_id).into());
            }

            conn.execute(
                "INSERT INTO task_comments (task_id, author_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![task_id, author_id, content, now, now],
            )?;

            Ok(TaskComment {
                id: conn.last_insert_rowid(),
                task_id,
                author_id,
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// List a task's comments, oldest first.
    pub fn list_comments(&self, task_id: i64, user_id: i64) -> Result<Vec<TaskComment>> {
        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let mut stmt = conn.prepare(
                "SELECT * FROM task_comments WHERE task_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;

            let comments = stmt
                .query_map(params![task_id], parse_comment_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(comments)
        })
    }

    /// Edit a comment. Only the author may edit.
    pub fn update_comment(
        &self,
        task_id: i64,
        comment_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<TaskComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::missing_field("content").into());
        }

        let now = now_ms();

        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let comment = get_comment_internal(conn, comment_id)?
                .ok_or_else(|| anyhow!(ApiError::comment_not_found(comment_id)))?;
            if comment.task_id != task_id {
                return Err(ApiError::comment_not_found(comment_id).into());
            }
            if comment.author_id != user_id {
                return Err(ApiError::permission_denied(task_id).into());
            }

            conn.execute(
                "UPDATE task_comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, now, comment_id],
            )?;

            Ok(TaskComment {
                content: content.to_string(),
                updated_at: now,
                ..comment
            })
        })
    }

    /// Delete a comment. The author or the task owner may delete.
    pub fn delete_comment(&self, task_id: i64, comment_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let task = get_visible_task(conn, task_id, user_id)?;

            let comment = get_comment_internal(conn, comment_id)?
                .ok_or_else(|| anyhow!(ApiError::comment_not_found(comment_id)))?;
            if comment.task_id != task_id {
                return Err(ApiError::comment_not_found(comment_id).into());
            }
            if comment.author_id != user_id && task.owner_id != user_id {
                return Err(ApiError::permission_denied(task_id).into());
            }

            conn.execute(
                "DELETE FROM task_comments WHERE id = ?1",
                params![comment_id],
            )?;
            Ok(())
        })
    }
}
