//! Structured error types for API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    SelfDependency,
    DuplicateDependency,
    DependencyCycle,

    // Access errors
    PermissionDenied,
    Unauthenticated,

    // Not found errors
    UserNotFound,
    TaskNotFound,
    DependencyNotFound,
    CommentNotFound,
    ChecklistItemNotFound,

    // Conflict errors
    AlreadyExists,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error surfaced to API clients.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn self_dependency(task_id: i64) -> Self {
        Self::new(
            ErrorCode::SelfDependency,
            format!("Task {} cannot depend on itself", task_id),
        )
    }

    pub fn duplicate_dependency(task_id: i64, depends_on_id: i64) -> Self {
        Self::new(
            ErrorCode::DuplicateDependency,
            format!(
                "Dependency {} -> {} already exists",
                task_id, depends_on_id
            ),
        )
    }

    pub fn dependency_cycle(task_id: i64, depends_on_id: i64) -> Self {
        Self::new(
            ErrorCode::DependencyCycle,
            format!(
                "Dependency {} -> {} would create a cycle",
                task_id, depends_on_id
            ),
        )
    }

    pub fn permission_denied(task_id: i64) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("Not owner or assignee of task {}", task_id),
        )
    }

    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "Authentication required")
    }

    pub fn user_not_found(user_id: i64) -> Self {
        Self::new(ErrorCode::UserNotFound, format!("User not found: {}", user_id))
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", task_id))
    }

    pub fn dependency_not_found(dep_id: i64) -> Self {
        Self::new(
            ErrorCode::DependencyNotFound,
            format!("Dependency not found: {}", dep_id),
        )
    }

    pub fn comment_not_found(comment_id: i64) -> Self {
        Self::new(
            ErrorCode::CommentNotFound,
            format!("Comment not found: {}", comment_id),
        )
    }

    pub fn checklist_item_not_found(item_id: i64) -> Self {
        Self::new(
            ErrorCode::ChecklistItemNotFound,
            format!("Checklist item not found: {}", item_id),
        )
    }

    pub fn already_exists(what: impl fmt::Display) -> Self {
        Self::new(ErrorCode::AlreadyExists, format!("{} already exists", what))
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// HTTP status for this error code.
    pub fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::SelfDependency
            | ErrorCode::DuplicateDependency
            | ErrorCode::DependencyCycle
            | ErrorCode::AlreadyExists => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::UserNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::DependencyNotFound
            | ErrorCode::CommentNotFound
            | ErrorCode::ChecklistItemNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to ApiError first
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self }))).into_response()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_downcast_preserves_code() {
        let err: anyhow::Error = ApiError::self_dependency(7).into();
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::SelfDependency);
    }

    #[test]
    fn foreign_anyhow_becomes_internal() {
        let err = anyhow::anyhow!("boom");
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::InternalError);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::dependency_cycle(1, 2).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::permission_denied(1).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::task_not_found(1).status(), StatusCode::NOT_FOUND);
    }
}
