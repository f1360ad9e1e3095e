//! Dependency edges, cycle detection, and blocker queries.
//!
//! An edge `task -> depends_on` means the task is blocked until the
//! task it depends on completes. The set of active edges must stay
//! acyclic; inactive edges are retained but inert.

use super::tasks::{get_task_for_write, get_task_internal, parse_task_row};
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{Task, TaskDependency};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};
use std::collections::{HashSet, VecDeque};

fn parse_dependency_row(row: &Row) -> rusqlite::Result<TaskDependency> {
    let active: i64 = row.get("active")?;

    Ok(TaskDependency {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        depends_on_id: row.get("depends_on_id")?,
        created_by_id: row.get("created_by_id")?,
        notes: row.get("notes")?,
        active: active != 0,
        created_at: row.get("created_at")?,
    })
}

fn get_dependency_internal(conn: &Connection, dep_id: i64) -> Result<Option<TaskDependency>> {
    let mut stmt = conn.prepare("SELECT * FROM task_dependencies WHERE id = ?1")?;

    let result = stmt.query_row(params![dep_id], parse_dependency_row);

    match result {
        Ok(dep) => Ok(Some(dep)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Check if adding or reactivating the edge `task -> depends_on`
/// would close a cycle among active edges.
///
/// The candidate edge points from `task_id` to `depends_on_id`, so a
/// cycle exists exactly when `task_id` is already reachable from
/// `depends_on_id` by following active edges in the depends-on
/// direction. Breadth-first with a visited set: terminates in O(V+E)
/// even if the stored graph is somehow already cyclic.
fn would_create_cycle(conn: &Connection, task_id: i64, depends_on_id: i64) -> Result<bool> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut queue: VecDeque<i64> = VecDeque::new();
    queue.push_back(depends_on_id);

    while let Some(current) = queue.pop_front() {
        if current == task_id {
            return Ok(true); // Would create a cycle
        }

        if !visited.insert(current) {
            continue;
        }

        let mut stmt = conn.prepare(
            "SELECT depends_on_id FROM task_dependencies
             WHERE task_id = ?1 AND active = 1",
        )?;

        let next: Vec<i64> = stmt
            .query_map(params![current], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for id in next {
            if !visited.contains(&id) {
                queue.push_back(id);
            }
        }
    }

    Ok(false)
}

impl Database {
    /// Create a dependency edge: `task_id` depends on `depends_on_id`.
    ///
    /// The caller must be owner or assignee of both tasks. Fails with
    /// `SelfDependency`, `DuplicateDependency`, or `DependencyCycle`
    /// before anything is written; the validation reads and the
    /// insert run under the same connection lock.
    pub fn create_dependency(
        &self,
        task_id: i64,
        depends_on_id: i64,
        user_id: i64,
        notes: Option<String>,
    ) -> Result<TaskDependency> {
        let now = now_ms();
        let notes = notes.unwrap_or_default();

        self.with_conn(|conn| {
            get_task_for_write(conn, task_id, user_id)?;

            let target = get_task_internal(conn, depends_on_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(depends_on_id)))?;
            if !target.is_owner_or_assignee(user_id) {
                return Err(ApiError::permission_denied(depends_on_id).into());
            }

            // Self-loops are a validation failure of their own, not a
            // degenerate case of reachability.
            if task_id == depends_on_id {
                return Err(ApiError::self_dependency(task_id).into());
            }

            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM task_dependencies
                 WHERE task_id = ?1 AND depends_on_id = ?2)",
                params![task_id, depends_on_id],
                |row| row.get(0),
            )?;
            if exists {
                return Err(ApiError::duplicate_dependency(task_id, depends_on_id).into());
            }

            if would_create_cycle(conn, task_id, depends_on_id)? {
                return Err(ApiError::dependency_cycle(task_id, depends_on_id).into());
            }

            conn.execute(
                "INSERT INTO task_dependencies
                 (task_id, depends_on_id, created_by_id, notes, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![task_id, depends_on_id, user_id, notes, now],
            )?;

            Ok(TaskDependency {
                id: conn.last_insert_rowid(),
                task_id,
                depends_on_id,
                created_by_id: user_id,
                notes,
                active: true,
                created_at: now,
            })
        })
    }

    /// Flip the active flag of an edge.
    ///
    /// Reactivation re-runs the cycle check: edges added while this
    /// one was inactive may have made it unsafe. Deactivation never
    /// needs validation. The edge is untouched on failure.
    pub fn toggle_dependency(
        &self,
        task_id: i64,
        dep_id: i64,
        user_id: i64,
    ) -> Result<TaskDependency> {
        self.with_conn(|conn| {
            get_task_for_write(conn, task_id, user_id)?;

            let dep = get_dependency_internal(conn, dep_id)?
                .ok_or_else(|| anyhow!(ApiError::dependency_not_found(dep_id)))?;
            if dep.task_id != task_id {
                return Err(ApiError::dependency_not_found(dep_id).into());
            }

            // The edge itself is inactive right now, so the traversal
            // below cannot see it.
            if !dep.active && would_create_cycle(conn, dep.task_id, dep.depends_on_id)? {
                return Err(
                    ApiError::dependency_cycle(dep.task_id, dep.depends_on_id).into(),
                );
            }

            let new_active = !dep.active;
            conn.execute(
                "UPDATE task_dependencies SET active = ?1 WHERE id = ?2",
                params![new_active as i64, dep_id],
            )?;

            Ok(TaskDependency {
                active: new_active,
                ..dep
            })
        })
    }

    /// Delete an edge.
    pub fn delete_dependency(&self, task_id: i64, dep_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            get_task_for_write(conn, task_id, user_id)?;

            let dep = get_dependency_internal(conn, dep_id)?
                .ok_or_else(|| anyhow!(ApiError::dependency_not_found(dep_id)))?;
            if dep.task_id != task_id {
                return Err(ApiError::dependency_not_found(dep_id).into());
            }

            conn.execute(
                "DELETE FROM task_dependencies WHERE id = ?1",
                params![dep_id],
            )?;
            Ok(())
        })
    }

    /// List a task's dependency edges, newest first, active and
    /// inactive alike. Callers without owner/assignee standing get an
    /// empty list rather than an error.
    pub fn list_dependencies(&self, task_id: i64, user_id: i64) -> Result<Vec<TaskDependency>> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(user_id) {
                return Ok(vec![]);
            }

            let mut stmt = conn.prepare(
                "SELECT * FROM task_dependencies WHERE task_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;

            let deps = stmt
                .query_map(params![task_id], parse_dependency_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(deps)
        })
    }

    /// Tasks this task directly depends on via active edges (one hop,
    /// not the transitive closure). Soft visibility rule as above.
    pub fn blockers_of(&self, task_id: i64, user_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(user_id) {
                return Ok(vec![]);
            }

            let mut stmt = conn.prepare(
                "SELECT DISTINCT t.* FROM tasks t
                 INNER JOIN task_dependencies d ON t.id = d.depends_on_id
                 WHERE d.task_id = ?1 AND d.active = 1
                 ORDER BY t.created_at DESC",
            )?;

            let tasks = stmt
                .query_map(params![task_id], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(tasks)
        })
    }

    /// Tasks that directly depend on this task via active edges.
    pub fn blocked_by(&self, task_id: i64, user_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(user_id) {
                return Ok(vec![]);
            }

            let mut stmt = conn.prepare(
                "SELECT DISTINCT t.* FROM tasks t
                 INNER JOIN task_dependencies d ON t.id = d.task_id
                 WHERE d.depends_on_id = ?1 AND d.active = 1
                 ORDER BY t.created_at DESC",
            )?;

            let tasks = stmt
                .query_map(params![task_id], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(tasks)
        })
    }

    /// Number of active edges blocking this task.
    pub fn blocked_by_count(&self, task_id: i64, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(user_id) {
                return Ok(0);
            }

            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM task_dependencies
                 WHERE task_id = ?1 AND active = 1",
                params![task_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Number of active edges this task blocks.
    pub fn blocking_count(&self, task_id: i64, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| anyhow!(ApiError::task_not_found(task_id)))?;
            if !task.is_owner_or_assignee(user_id) {
                return Ok(0);
            }

            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM task_dependencies
                 WHERE depends_on_id = ?1 AND active = 1",
                params![task_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
