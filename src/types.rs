//! Core domain types for the taskboard backend.

use serde::{Deserialize, Serialize};

/// A registered user. Authentication is handled by an external
/// collaborator; this is identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

/// Compact user representation for nested serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "TODO")]
    Todo,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(TaskStatus::Todo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            _ => None,
        }
    }

    /// Sort rank: higher number = more important.
    pub fn rank(&self) -> i32 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

/// A task. Owned by its creator, mutable by owner or assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub owner_id: i64,
    pub assignee_id: i64,
    pub created_at: i64,
    pub due_date: i64,
    pub tags: Vec<String>,
    /// Estimated duration in hours.
    pub duration_hours: Option<f64>,
}

impl Task {
    /// Whether the user may see and mutate this task.
    pub fn is_owner_or_assignee(&self, user_id: i64) -> bool {
        self.owner_id == user_id || self.assignee_id == user_id
    }
}

/// Compact task representation nested inside dependency responses
/// and blocker/blocked lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
}

impl From<&Task> for TaskSummary {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            status: t.status,
            priority: t.priority,
        }
    }
}

/// A free-text comment on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A checklist item within a task. Positions are 1-based and unique
/// per task; reorder rewrites them gap-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: i64,
    pub task_id: i64,
    pub text: String,
    pub is_completed: bool,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A directed dependency edge: `task_id` depends on `depends_on_id`
/// and is considered blocked until it completes. Inactive edges are
/// retained but excluded from cycle checks and blocker queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: i64,
    pub task_id: i64,
    pub depends_on_id: i64,
    pub created_by_id: i64,
    pub notes: String,
    pub active: bool,
    pub created_at: i64,
}

/// Parse the comma-separated tag encoding into a trimmed list.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Join a tag list back into the stored encoding.
pub fn encode_tags(tags: &[String]) -> String {
    tags.join(",")
}
