//! HTTP API for the taskboard backend.
//!
//! Authentication is terminated by an external collaborator; the
//! authenticated principal arrives as the `X-User-Id` header and is
//! resolved once per request by the [`CurrentUser`] extractor.
//! Anonymous requests get zero access.

pub mod checklist;
pub mod comments;
pub mod deps;
pub mod tasks;
pub mod users;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::Database;
use crate::error::ApiError;
use crate::types::User;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// The authenticated principal, resolved from `X-User-Id`.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id: i64 = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(ApiError::unauthenticated)?;

        let user = state
            .db()
            .get_user(user_id)
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::unauthenticated)?;

        Ok(CurrentUser(user))
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Users
        .route("/api/users", post(users::create_user))
        .route("/api/users/me", get(users::me))
        .route("/api/users/{user_id}", get(users::get_user))
        // Tasks
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{task_id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Comments
        .route(
            "/api/tasks/{task_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/tasks/{task_id}/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        // Checklist
        .route(
            "/api/tasks/{task_id}/checklist",
            get(checklist::list_items).post(checklist::create_item),
        )
        .route(
            "/api/tasks/{task_id}/checklist/reorder",
            post(checklist::reorder),
        )
        .route(
            "/api/tasks/{task_id}/checklist/{item_id}",
            patch(checklist::update_item).delete(checklist::delete_item),
        )
        // Dependencies
        .route(
            "/api/tasks/{task_id}/dependencies",
            get(deps::list_dependencies).post(deps::create_dependency),
        )
        .route(
            "/api/tasks/{task_id}/dependencies/{dep_id}/toggle",
            patch(deps::toggle_dependency),
        )
        .route(
            "/api/tasks/{task_id}/dependencies/{dep_id}",
            delete(deps::delete_dependency),
        )
        .route("/api/tasks/{task_id}/blockers", get(deps::blockers))
        .route("/api/tasks/{task_id}/blocked", get(deps::blocked))
        // Health
        .route("/api/health", get(health))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port and serve until the
/// process is stopped.
pub async fn start_server(db: Arc<Database>, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(db);
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Taskboard API listening on http://{}", bound_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
