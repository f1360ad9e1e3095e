//! Checklist item operations.
//!
//! Positions are 1-based within a task. New items append at
//! max(position) + 1; reorder rewrites the whole set gap-free in a
//! single transaction.

use super::tasks::get_visible_task;
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::ChecklistItem;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;

fn parse_item_row(row: &Row) -> rusqlite::Result<ChecklistItem> {
    let is_completed: i64 = row.get("is_completed")?;

    Ok(ChecklistItem {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        text: row.get("text")?,
        is_completed: is_completed != 0,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn get_item_internal(conn: &Connection, item_id: i64) -> Result<Option<ChecklistItem>> {
    let mut stmt = conn.prepare("SELECT * FROM checklist_items WHERE id = ?1")?;

    let result = stmt.query_row(params![item_id], parse_item_row);

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Append a checklist item to a task.
    pub fn create_checklist_item(
        &self,
        task_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<ChecklistItem> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::missing_field("text").into());
        }

        let now = now_ms();

        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let max_position: i64 = conn.query_row(
                "SELECT COALESCE(MAX(position), 0) FROM checklist_items WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;
            let position = max_position + 1;

            conn.execute(
                "INSERT INTO checklist_items
                 (task_id, text, is_completed, position, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?5)",
                params![task_id, text, position, now, now],
            )?;

            Ok(ChecklistItem {
                id: conn.last_insert_rowid(),
                task_id,
                text: text.to_string(),
                is_completed: false,
                position,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// List a task's checklist items ordered by position.
    pub fn list_checklist_items(&self, task_id: i64, user_id: i64) -> Result<Vec<ChecklistItem>> {
        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let mut stmt = conn.prepare(
                "SELECT * FROM checklist_items WHERE task_id = ?1 ORDER BY position ASC",
            )?;

            let items = stmt
                .query_map(params![task_id], parse_item_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(items)
        })
    }

    /// Update an item's text and/or completion flag.
    pub fn update_checklist_item(
        &self,
        task_id: i64,
        item_id: i64,
        user_id: i64,
        text: Option<String>,
        is_completed: Option<bool>,
    ) -> Result<ChecklistItem> {
        let now = now_ms();

        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let item = get_item_internal(conn, item_id)?
                .ok_or_else(|| anyhow!(ApiError::checklist_item_not_found(item_id)))?;
            if item.task_id != task_id {
                return Err(ApiError::checklist_item_not_found(item_id).into());
            }

            let new_text = match text {
                Some(t) => {
                    let t = t.trim().to_string();
                    if t.is_empty() {
                        return Err(ApiError::missing_field("text").into());
                    }
                    t
                }
                None => item.text.clone(),
            };
            let new_completed = is_completed.unwrap_or(item.is_completed);

            conn.execute(
                "UPDATE checklist_items SET text = ?1, is_completed = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![new_text, new_completed as i64, now, item_id],
            )?;

            Ok(ChecklistItem {
                text: new_text,
                is_completed: new_completed,
                updated_at: now,
                ..item
            })
        })
    }

    /// Delete an item. Remaining positions keep their gaps until the
    /// next reorder.
    pub fn delete_checklist_item(&self, task_id: i64, item_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let item = get_item_internal(conn, item_id)?
                .ok_or_else(|| anyhow!(ApiError::checklist_item_not_found(item_id)))?;
            if item.task_id != task_id {
                return Err(ApiError::checklist_item_not_found(item_id).into());
            }

            conn.execute(
                "DELETE FROM checklist_items WHERE id = ?1",
                params![item_id],
            )?;
            Ok(())
        })
    }

    /// Rewrite positions for a task's entire item set.
    ///
    /// `item_ids` must be a permutation of the task's current items;
    /// positions become 1..n in the given order, atomically.
    pub fn reorder_checklist(
        &self,
        task_id: i64,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<ChecklistItem>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            get_visible_task(conn, task_id, user_id)?;

            let tx = conn.transaction()?;

            let existing: Vec<i64> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM checklist_items WHERE task_id = ?1")?;
                let ids = stmt
                    .query_map(params![task_id], |row| row.get(0))?
                    .filter_map(|r| r.ok())
                    .collect();
                ids
            };

            let existing_set: HashSet<i64> = existing.iter().copied().collect();
            let given_set: HashSet<i64> = item_ids.iter().copied().collect();
            if given_set != existing_set || item_ids.len() != existing.len() {
                return Err(ApiError::invalid_value(
                    "item_ids",
                    "must list every checklist item of the task exactly once",
                )
                .into());
            }

            for (index, item_id) in item_ids.iter().enumerate() {
                tx.execute(
                    "UPDATE checklist_items SET position = ?1, updated_at = ?2 WHERE id = ?3",
                    params![(index + 1) as i64, now, item_id],
                )?;
            }

            let items = {
                let mut stmt = tx.prepare(
                    "SELECT * FROM checklist_items WHERE task_id = ?1 ORDER BY position ASC",
                )?;
                let items: Vec<ChecklistItem> = stmt
                    .query_map(params![task_id], parse_item_row)?
                    .filter_map(|r| r.ok())
                    .collect();
                items
            };

            tx.commit()?;

            Ok(items)
        })
    }
}
